//! Tests for the flattener

use super::*;
use crate::error::Error;
use crate::fetch::Page;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

fn orders_schema() -> EntitySchema {
    EntitySchema::new("orders").child_with_key(
        "items",
        "order_id",
        EntitySchema::new("order_items"),
    )
}

fn products_schema() -> EntitySchema {
    EntitySchema::new("products").child_with_key(
        "variants",
        "product_id",
        EntitySchema::new("variants").child_with_key(
            "prices",
            "variant_id",
            EntitySchema::new("variant_prices"),
        ),
    )
}

#[test]
fn test_children_without_ids_get_synthetic_ids() {
    let records = vec![json!({
        "id": "o1",
        "state": "NEW",
        "items": [{"sku": "A"}, {"sku": "B"}, {"sku": "C"}]
    })];

    let flat = flatten_records(&records, &orders_schema()).unwrap();

    assert_eq!(flat.len(), 4);
    let parent = &flat[0];
    assert_eq!(parent.entity, "orders");
    assert_eq!(parent.get("items"), None);
    assert_eq!(parent.get("state"), Some(&json!("NEW")));

    let ids: Vec<_> = flat[1..].iter().map(|r| r.primary_key.as_str()).collect();
    assert_eq!(ids, vec!["o1_items_0", "o1_items_1", "o1_items_2"]);
    for child in &flat[1..] {
        assert_eq!(child.entity, "order_items");
        assert_eq!(child.get("order_id"), Some(&json!("o1")));
        assert_eq!(child.get("id"), Some(&json!(child.primary_key)));
        assert_eq!(child.parent.as_ref().unwrap().id, "o1");
    }
}

#[test]
fn test_natural_child_ids_are_kept() {
    let records = vec![json!({
        "id": 7,
        "items": [{"id": 100, "sku": "A"}, {"id": null, "sku": "B"}]
    })];

    let flat = flatten_records(&records, &orders_schema()).unwrap();

    assert_eq!(flat[0].primary_key, "7");
    assert_eq!(flat[0].get("id"), Some(&json!(7)));
    assert_eq!(flat[1].primary_key, "100");
    assert_eq!(flat[1].get("id"), Some(&json!(100)));
    assert_eq!(flat[1].get("order_id"), Some(&json!("7")));
    assert_eq!(flat[2].primary_key, "7_items_1");
    assert_eq!(flat[2].get("id"), Some(&json!("7_items_1")));
}

#[test_case(json!("") ; "blank string")]
#[test_case(json!(true) ; "boolean")]
#[test_case(json!({"gid": "x"}) ; "object")]
#[test_case(json!([1]) ; "array")]
fn test_unusable_child_id_is_replaced(natural: Value) {
    let records = vec![json!({
        "id": "o1",
        "items": [{"id": natural.clone(), "sku": "A"}, {"id": natural, "sku": "B"}]
    })];

    let flat = flatten_records(&records, &orders_schema()).unwrap();

    assert_eq!(flat.len(), 3);
    for (index, child) in flat[1..].iter().enumerate() {
        let expected = format!("o1_items_{index}");
        assert_eq!(child.primary_key, expected);
        assert_eq!(child.get("id"), Some(&json!(expected)));
        assert!(child.fields.keys().all(|k| !k.starts_with("id__")));
    }
}

#[test]
fn test_nested_objects_use_double_underscore() {
    let records = vec![json!({
        "id": "o1",
        "address": {"city": "Paris", "geo": {"lat": 48.8}},
        "tags": ["a", "b"],
        "meta": {}
    })];

    let flat = flatten_records(&records, &EntitySchema::new("orders")).unwrap();

    let keys: Vec<_> = flat[0].fields.keys().cloned().collect();
    assert_eq!(
        keys,
        vec!["address__city", "address__geo__lat", "id", "meta", "tags"]
    );
    assert_eq!(flat[0].get("tags"), Some(&json!(["a", "b"])));
}

#[test_case(json!([{"id": "v1"}, {"id": "v2"}]) ; "plain array")]
#[test_case(json!({"edges": [{"node": {"id": "v1"}}, {"node": {"id": "v2"}}]}) ; "relay edges")]
#[test_case(json!({"nodes": [{"id": "v1"}, {"id": "v2"}]}) ; "nodes list")]
fn test_collection_shapes(variants: Value) {
    let records = vec![json!({"id": "p1", "variants": variants})];
    let flat = flatten_records(&records, &products_schema()).unwrap();

    let variants: Vec<_> = flat
        .iter()
        .filter(|r| r.entity == "variants")
        .map(|r| r.primary_key.as_str())
        .collect();
    assert_eq!(variants, vec!["v1", "v2"]);
}

#[test]
fn test_three_levels_parent_before_children() {
    let records = vec![json!({
        "id": "p1",
        "variants": {"edges": [
            {"node": {"id": "v1", "prices": [{"amount": "9.99"}, {"amount": "8.99"}]}},
            {"node": {"id": "v2", "prices": []}}
        ]}
    })];

    let flat = flatten_records(&records, &products_schema()).unwrap();

    let order: Vec<_> = flat
        .iter()
        .map(|r| (r.entity.as_str(), r.primary_key.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("products", "p1"),
            ("variants", "v1"),
            ("variant_prices", "v1_prices_0"),
            ("variant_prices", "v1_prices_1"),
            ("variants", "v2"),
        ]
    );
    assert_eq!(flat[2].get("variant_id"), Some(&json!("v1")));
    assert_eq!(flat[1].get("prices"), None);
}

#[test]
fn test_missing_child_collection_emits_parent_only() {
    let records = vec![json!({"id": "o1"}), json!({"id": "o2", "items": null})];
    let flat = flatten_records(&records, &orders_schema()).unwrap();
    assert_eq!(flat.len(), 2);
}

#[test]
fn test_scalar_children_use_value_field() {
    let schema = EntitySchema::new("products").child("tags", EntitySchema::new("product_tags"));
    let records = vec![json!({"id": "p1", "tags": ["red", "sale"]})];

    let flat = flatten_records(&records, &schema).unwrap();

    assert_eq!(flat[1].get(SCALAR_FIELD), Some(&json!("red")));
    assert_eq!(flat[1].get("products_id"), Some(&json!("p1")));
    assert_eq!(flat[2].primary_key, "p1_tags_1");
}

#[test]
fn test_missing_top_level_id_is_malformed() {
    let records = vec![json!({"id": "o1"}), json!({"state": "NEW"})];
    let err = flatten_records(&records, &orders_schema()).unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));

    let err = flatten_records(&[json!("o1")], &orders_schema()).unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
}

#[test]
fn test_flatten_is_deterministic() {
    let page = Page {
        number: 1,
        records: vec![
            json!({"z": 1, "id": "o1", "a": {"y": 2, "b": 3}, "items": [{"sku": "A"}]}),
            json!({"id": "o2", "items": {"edges": [{"node": {"id": "i9"}}]}}),
        ],
        next_cursor: None,
        remaining_budget: None,
        status: 200,
    };

    let first = serde_json::to_string(&flatten(&page, &orders_schema()).unwrap()).unwrap();
    let second = serde_json::to_string(&flatten(&page, &orders_schema()).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_entities_and_validate() {
    let schema = products_schema();
    let entities = schema.entities();

    assert_eq!(
        entities.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        vec!["products", "variants", "variant_prices"]
    );
    assert_eq!(entities[2].parent.as_deref(), Some("variants"));
    assert_eq!(entities[2].foreign_key.as_deref(), Some("variant_id"));
    assert!(schema.validate().is_ok());

    let duplicate = EntitySchema::new("orders").child("items", EntitySchema::new("orders"));
    assert!(duplicate.validate().is_err());
}

#[test]
fn test_schema_from_yaml() {
    let yaml = r"
name: products
children:
  - field: variants
    foreign_key: product_id
    name: variants
    primary_key: legacy_id
";
    let schema: EntitySchema = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(schema.primary_key, "id");
    assert_eq!(schema.children[0].entity.primary_key, "legacy_id");
    assert_eq!(
        schema.children[0].foreign_key_for(&schema),
        "product_id".to_string()
    );
}
