//! Parent/child flattening

use super::types::{ChildSchema, EntitySchema, FlatRecord, ParentRef};
use crate::error::{Error, ResponseContext, Result};
use crate::fetch::Page;
use crate::types::{JsonObject, JsonValue};
use std::collections::BTreeMap;

/// Separator between nested object keys
pub const NESTED_SEPARATOR: &str = "__";

/// Field used for scalar elements of a declared child collection
pub const SCALAR_FIELD: &str = "value";

/// Flatten one fetched page
pub fn flatten(page: &Page, schema: &EntitySchema) -> Result<Vec<FlatRecord>> {
    flatten_with_status(&page.records, schema, page.status)
}

/// Flatten records taken from a successful response
pub fn flatten_records(records: &[JsonValue], schema: &EntitySchema) -> Result<Vec<FlatRecord>> {
    flatten_with_status(records, schema, 200)
}

fn flatten_with_status(
    records: &[JsonValue],
    schema: &EntitySchema,
    status: u16,
) -> Result<Vec<FlatRecord>> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let Some(object) = record.as_object() else {
            return Err(malformed(schema, status, record, "record is not an object"));
        };
        let Some(id) = object.get(&schema.primary_key).and_then(id_string) else {
            return Err(malformed(
                schema,
                status,
                record,
                format!("record has no '{}'", schema.primary_key),
            ));
        };
        emit(object, schema, id, None, &mut out);
    }
    Ok(out)
}

fn malformed(
    schema: &EntitySchema,
    status: u16,
    record: &JsonValue,
    message: impl Into<String>,
) -> Error {
    Error::malformed(
        format!("{} {}", schema.name, message.into()),
        ResponseContext::new(format!("flatten {}", schema.name), status, record.to_string()),
    )
}

/// Emit `object` and, depth first, its declared children
fn emit(
    object: &JsonObject,
    schema: &EntitySchema,
    id: String,
    parent: Option<ParentRef>,
    out: &mut Vec<FlatRecord>,
) {
    let mut fields = BTreeMap::new();
    for (key, value) in object {
        if schema.children.iter().any(|c| &c.field == key) {
            continue;
        }
        flatten_value(key, value, &mut fields);
    }

    if let Some(parent) = &parent {
        fields.insert(
            parent.foreign_key.clone(),
            JsonValue::String(parent.id.clone()),
        );
    }
    fields
        .entry(schema.primary_key.clone())
        .or_insert_with(|| JsonValue::String(id.clone()));

    out.push(FlatRecord {
        entity: schema.name.clone(),
        primary_key: id.clone(),
        fields,
        parent,
    });

    for child in &schema.children {
        let elements = object.get(&child.field).map(collection).unwrap_or_default();
        emit_children(&elements, child, schema, &id, out);
    }
}

fn emit_children(
    elements: &[&JsonValue],
    child: &ChildSchema,
    parent_schema: &EntitySchema,
    parent_id: &str,
    out: &mut Vec<FlatRecord>,
) {
    let foreign_key = child.foreign_key_for(parent_schema);

    for (index, element) in elements.iter().enumerate() {
        let mut object = match *element {
            JsonValue::Object(object) => object.clone(),
            scalar => {
                let mut object = JsonObject::new();
                object.insert(SCALAR_FIELD.to_string(), scalar.clone());
                object
            }
        };

        // A natural id that cannot serve as a key (null, blank, bool, nested)
        // is dropped so the synthetic id takes its place in the row
        let id = match object.get(&child.entity.primary_key).and_then(id_string) {
            Some(id) => id,
            None => {
                object.remove(&child.entity.primary_key);
                format!("{parent_id}_{}_{index}", child.field)
            }
        };

        let parent = ParentRef {
            entity: parent_schema.name.clone(),
            foreign_key: foreign_key.clone(),
            id: parent_id.to_string(),
        };
        emit(&object, &child.entity, id, Some(parent), out);
    }
}

/// Elements of a child collection
///
/// Accepts plain arrays, Relay `{"edges": [{"node": ...}]}`, `{"nodes": [...]}`
/// and a single object (a one-to-one child).
fn collection(value: &JsonValue) -> Vec<&JsonValue> {
    match value {
        JsonValue::Array(items) => items.iter().collect(),
        JsonValue::Object(object) => {
            if let Some(JsonValue::Array(edges)) = object.get("edges") {
                edges
                    .iter()
                    .map(|edge| edge.get("node").unwrap_or(edge))
                    .collect()
            } else if let Some(JsonValue::Array(nodes)) = object.get("nodes") {
                nodes.iter().collect()
            } else {
                vec![value]
            }
        }
        JsonValue::Null => Vec::new(),
        scalar => vec![scalar],
    }
}

/// Write `value` under `key`, expanding nested objects into `key__sub` fields
fn flatten_value(key: &str, value: &JsonValue, fields: &mut BTreeMap<String, JsonValue>) {
    match value {
        JsonValue::Object(object) if !object.is_empty() => {
            for (sub, nested) in object {
                flatten_value(&format!("{key}{NESTED_SEPARATOR}{sub}"), nested, fields);
            }
        }
        other => {
            fields.insert(key.to_string(), other.clone());
        }
    }
}

/// Natural id as a string; null and structured values do not count
pub(crate) fn id_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
