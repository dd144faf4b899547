//! Flattener types

use crate::error::{Error, Result};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Shape of one entity and its declared child collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Entity name, also the output table name
    pub name: String,

    /// Field holding the natural id
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Nested collections emitted as their own entities
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildSchema>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// A nested collection inside a parent entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSchema {
    /// Field of the parent record holding the collection
    pub field: String,

    /// Field added to each child carrying the parent's id.
    /// Defaults to `<parent>_<parent primary key>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    /// The child entity itself
    #[serde(flatten)]
    pub entity: EntitySchema,
}

impl EntitySchema {
    /// Entity with primary key `id` and no children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: default_primary_key(),
            children: Vec::new(),
        }
    }

    /// Set the primary key field
    #[must_use]
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Declare a child collection
    #[must_use]
    pub fn child(mut self, field: impl Into<String>, entity: EntitySchema) -> Self {
        self.children.push(ChildSchema {
            field: field.into(),
            foreign_key: None,
            entity,
        });
        self
    }

    /// Declare a child collection with an explicit foreign key field
    #[must_use]
    pub fn child_with_key(
        mut self,
        field: impl Into<String>,
        foreign_key: impl Into<String>,
        entity: EntitySchema,
    ) -> Self {
        self.children.push(ChildSchema {
            field: field.into(),
            foreign_key: Some(foreign_key.into()),
            entity,
        });
        self
    }

    /// Every entity in the tree, parents before children
    pub fn entities(&self) -> Vec<EntityInfo> {
        let mut out = Vec::new();
        collect_entities(self, None, &mut out);
        out
    }

    /// Check names and keys are present and entity names are unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for info in self.entities() {
            if info.name.trim().is_empty() {
                return Err(Error::invalid_value("schema.name", "must not be empty"));
            }
            if info.primary_key.trim().is_empty() {
                return Err(Error::invalid_value(
                    format!("schema.{}.primary_key", info.name),
                    "must not be empty",
                ));
            }
            if !seen.insert(info.name.clone()) {
                return Err(Error::invalid_value(
                    "schema.name",
                    format!("entity '{}' declared more than once", info.name),
                ));
            }
        }
        for child in &self.children {
            if child.field.trim().is_empty() {
                return Err(Error::invalid_value(
                    format!("schema.{}.children.field", self.name),
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }
}

impl ChildSchema {
    /// Foreign key field name given the parent entity
    pub fn foreign_key_for(&self, parent: &EntitySchema) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}_{}", parent.name, parent.primary_key))
    }
}

fn collect_entities(
    schema: &EntitySchema,
    parent: Option<(&str, String)>,
    out: &mut Vec<EntityInfo>,
) {
    let (parent_entity, foreign_key) = match parent {
        Some((entity, key)) => (Some(entity.to_string()), Some(key)),
        None => (None, None),
    };
    out.push(EntityInfo {
        name: schema.name.clone(),
        primary_key: schema.primary_key.clone(),
        foreign_key,
        parent: parent_entity,
    });
    for child in &schema.children {
        collect_entities(
            &child.entity,
            Some((&schema.name, child.foreign_key_for(schema))),
            out,
        );
    }
}

/// Summary of one entity in a schema tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityInfo {
    pub name: String,
    pub primary_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Link from a child record to its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRef {
    /// Parent entity name
    pub entity: String,
    /// Foreign key field on the child
    pub foreign_key: String,
    /// Parent primary key value
    pub id: String,
}

/// One flat row of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    /// Entity name
    pub entity: String,
    /// Primary key value, natural or synthetic
    pub primary_key: String,
    /// Flattened fields, sorted by name
    pub fields: BTreeMap<String, JsonValue>,
    /// Parent link for child records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl FlatRecord {
    /// Field value by name
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    /// The row as a JSON object
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
