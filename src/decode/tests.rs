//! Tests for decoder module

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// DecoderConfig Tests
// ============================================================================

#[test]
fn test_decoder_config_default_unwraps_nodes() {
    let config = DecoderConfig::default();
    assert!(config.record_path.is_none());
    assert!(config.unwrap_node);

    let config: DecoderConfig = serde_yaml::from_str("record_path: data.orders.edges").unwrap();
    assert_eq!(config, DecoderConfig::with_path("data.orders.edges"));
}

// ============================================================================
// JsonDecoder Tests
// ============================================================================

#[test]
fn test_json_decoder_array_body() {
    let decoder = JsonDecoder::new();
    let records = decoder.decode(&json!([{"id": 1}, {"id": 2}])).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_json_decoder_object_body_without_path() {
    let decoder = JsonDecoder::new();
    let records = decoder.decode(&json!({"id": 1})).unwrap();
    assert_eq!(records, vec![json!({"id": 1})]);
}

#[test]
fn test_json_decoder_faire_orders() {
    let decoder = JsonDecoder::with_path("orders");
    let body = json!({
        "page": 1,
        "limit": 50,
        "cursor": "abc",
        "orders": [{"id": "bo_1"}, {"id": "bo_2"}]
    });

    let records = decoder.decode(&body).unwrap();
    assert_eq!(records, vec![json!({"id": "bo_1"}), json!({"id": "bo_2"})]);
}

#[test]
fn test_json_decoder_unwraps_relay_edges() {
    let decoder = JsonDecoder::with_path("data.orders.edges");
    let body = json!({
        "data": {"orders": {
            "edges": [
                {"cursor": "c1", "node": {"id": "gid://shopify/Order/1"}},
                {"cursor": "c2", "node": {"id": "gid://shopify/Order/2"}}
            ],
            "pageInfo": {"hasNextPage": false, "endCursor": "c2"}
        }}
    });

    let records = decoder.decode(&body).unwrap();
    assert_eq!(
        records,
        vec![
            json!({"id": "gid://shopify/Order/1"}),
            json!({"id": "gid://shopify/Order/2"})
        ]
    );
}

#[test]
fn test_json_decoder_keeps_node_with_other_fields() {
    let decoder = JsonDecoder::with_path("items");
    let body = json!({"items": [{"node": {"id": 1}, "quantity": 2}]});
    let records = decoder.decode(&body).unwrap();
    assert_eq!(records, vec![json!({"node": {"id": 1}, "quantity": 2})]);
}

#[test]
fn test_json_decoder_no_unwrap_when_disabled() {
    let decoder = JsonDecoder::with_path("edges").unwrap_node(false);
    let body = json!({"edges": [{"node": {"id": 1}}]});
    let records = decoder.decode(&body).unwrap();
    assert_eq!(records, vec![json!({"node": {"id": 1}})]);
}

#[test]
fn test_json_decoder_missing_or_null_path_is_empty() {
    let decoder = JsonDecoder::with_path("data.products.data.edges");
    assert!(decoder.decode(&json!({"data": {}})).unwrap().is_empty());
    assert!(decoder
        .decode(&json!({"data": {"products": null}}))
        .unwrap()
        .is_empty());
}

#[test]
fn test_json_decoder_jsonpath_wildcard() {
    let decoder = JsonDecoder::with_path("$.data[*]");
    let records = decoder
        .decode(&json!({"data": [{"id": 1}, {"id": 2}]}))
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_json_decoder_rejects_scalar_bodies() {
    let decoder = JsonDecoder::with_path("orders");

    let err = decoder.decode(&json!("<html>maintenance</html>")).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.to_string().contains("string"));

    let err = decoder.decode(&serde_json::Value::Null).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

// ============================================================================
// Path Lookup Tests
// ============================================================================

#[test]
fn test_lookup_paths() {
    let value = json!({
        "data": {
            "items": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
            "pageInfo": {"hasNextPage": true, "endCursor": "xyz"}
        },
        "count": 3
    });

    assert_eq!(lookup(&value, "data.pageInfo.endCursor"), Some(&json!("xyz")));
    assert_eq!(lookup(&value, "$.data.pageInfo.endCursor"), Some(&json!("xyz")));
    assert_eq!(lookup(&value, "data.items[0].id"), Some(&json!("a")));
    assert_eq!(lookup(&value, "data.items[-1].id"), Some(&json!("c")));
    assert_eq!(lookup(&value, "data.items[-4]"), None);
    assert_eq!(lookup(&value, "data.items[*]").map(|v| v.is_array()), Some(true));
    assert_eq!(lookup(&value, "data.missing"), None);
    assert_eq!(lookup(&value, "$"), Some(&value));

    assert_eq!(lookup_string(&value, "count"), Some("3".to_string()));
    assert_eq!(
        lookup_string(&value, "data.pageInfo.hasNextPage"),
        Some("true".to_string())
    );
    assert_eq!(lookup_string(&value, "data.items"), None);
}
