//! Tests for YAML loader module

use super::*;
use crate::auth::AuthConfig;
use crate::budget::BudgetStrategy;
use crate::connectors;
use crate::error::Error;
use crate::fetch::Page;
use crate::http::{ScriptedTransport, TransportResponse};
use crate::pagination::{CursorRule, PaginationConfig};
use crate::provider::ProviderKind;
use crate::sleep::RecordingSleeper;
use crate::template::TemplateContext;
use crate::types::TimestampFormat;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

const FAIRE_YAML: &str = r#"
name: faire
base_url: https://www.faire.com/external-api/v2
auth:
  type: faire_app
  application_id: "{{ env.FAIRE_APP_ID }}"
  application_secret: "{{ env.FAIRE_APP_SECRET }}"
  access_token: "{{ env.FAIRE_ACCESS_TOKEN }}"
retry:
  max_retries: 5
streams:
  - name: orders
    request:
      type: rest
      path: /orders
    records_path: orders
    pagination:
      type: body_cursor
      cursor_path: cursor
    cursor_rule: exclusive
    page_size:
      param: limit
      value: 50
    incremental:
      param: updated_at_min
      start_date: "{{ config.start_date }}"
    schema:
      name: orders
      children:
        - field: items
          name: order_items
"#;

fn faire_ctx() -> TemplateContext {
    TemplateContext::with_config(json!({"start_date": "2024-01-01"}))
        .env_var("FAIRE_APP_ID", "apa_1")
        .env_var("FAIRE_APP_SECRET", "secret")
        .env_var("FAIRE_ACCESS_TOKEN", "oauth")
}

async fn collect(fetcher: crate::fetch::PagedFetcher) -> Vec<Page> {
    fetcher
        .fetch_all()
        .map(|page| page.unwrap())
        .collect()
        .await
}

// ============================================================================
// Basic Loading Tests
// ============================================================================

#[test]
fn test_load_minimal_source() {
    let yaml = r#"
name: test-source
base_url: https://api.example.com
retry:
  max_retries: 3
streams:
  - name: users
    request:
      type: rest
      path: /users
"#;

    let def = load_source_from_str(yaml).unwrap();
    assert_eq!(def.name, "test-source");
    assert_eq!(def.provider, ProviderKind::Rest);
    assert_eq!(def.http.timeout_secs, 30);
    assert_eq!(def.retry.max_retries, 3);
    assert_eq!(def.retry.base_delay_ms, 1000);

    let stream = &def.streams[0];
    assert_eq!(stream.cursor_param, "cursor");
    assert_eq!(stream.cursor_rule, CursorRule::Combined);
    assert_eq!(stream.pagination, PaginationConfig::None);
    assert_eq!(stream.schema().name, "users");
    assert_eq!(stream.schema().primary_key, "id");
}

#[test]
fn test_load_full_faire_definition() {
    let def = load_source_from_str(FAIRE_YAML).unwrap();
    let stream = def.stream("orders").unwrap();

    assert_eq!(stream.cursor_rule, CursorRule::Exclusive);
    assert_eq!(stream.records_path.as_deref(), Some("orders"));
    assert_eq!(
        stream.pagination,
        PaginationConfig::BodyCursor {
            cursor_path: "cursor".to_string(),
            has_more_path: None,
            url_param: None,
        }
    );
    let incremental = stream.incremental.as_ref().unwrap();
    assert_eq!(incremental.format, TimestampFormat::Iso8601);

    let names: Vec<_> = stream
        .schema()
        .entities()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["orders", "order_items"]);
}

#[test]
fn test_load_graphql_stream_defaults_path() {
    let yaml = r#"
name: shiphero
base_url: https://public-api.shiphero.com
provider:
  type: shiphero
retry:
  max_retries: 3
budget:
  type: adaptive
streams:
  - name: products
    request:
      type: graphql
      query: "query($first: Int) { products { data(first: $first) { edges { node { id } } } } }"
      variables:
        warehouse_id: "{{ config.warehouse }}"
    records_path: data.products.data.edges
    pagination:
      type: graphql_connection
      connection_path: data.products.data
    cursor_param: after
"#;

    let def = load_source_from_str(yaml).unwrap();
    match &def.streams[0].request {
        RequestDefinition::Graphql { path, variables, .. } => {
            assert_eq!(path, "/graphql");
            assert_eq!(variables["warehouse_id"], json!("{{ config.warehouse }}"));
        }
        other => panic!("expected graphql request, got {other:?}"),
    }
    assert!(matches!(
        def.provider,
        ProviderKind::Shiphero { maximum_credits, .. } if maximum_credits == 4004.0
    ));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_missing_max_retries_is_rejected() {
    let yaml = r#"
name: x
base_url: https://api.example.com
retry:
  base_delay_ms: 100
streams:
  - name: a
    request:
      type: rest
      path: /a
"#;
    let err = load_source_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("max_retries"), "{err}");
}

#[test]
fn test_zero_max_retries_is_rejected() {
    let yaml = r#"
name: x
base_url: https://api.example.com
retry:
  max_retries: 0
streams:
  - name: a
    request:
      type: rest
      path: /a
"#;
    assert!(load_source_from_str(yaml).is_err());
}

#[test]
fn test_no_streams_is_rejected() {
    let yaml = r#"
name: x
base_url: https://api.example.com
retry:
  max_retries: 1
streams: []
"#;
    let err = load_source_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("at least one stream"));
}

#[test]
fn test_duplicate_stream_names_rejected() {
    let yaml = r#"
name: x
base_url: https://api.example.com
retry:
  max_retries: 1
streams:
  - name: a
    request: { type: rest, path: /a }
  - name: a
    request: { type: rest, path: /b }
"#;
    let err = load_source_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("Duplicate stream name"));
}

#[test]
fn test_zero_page_size_rejected() {
    let yaml = r#"
name: x
base_url: https://api.example.com
retry:
  max_retries: 1
streams:
  - name: a
    request: { type: rest, path: /a }
    page_size: { param: limit, value: 0 }
"#;
    let err = load_source_from_str(yaml).unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}

#[test]
fn test_unparseable_base_url_rejected() {
    let yaml = r#"
name: x
base_url: "not a url"
retry:
  max_retries: 1
streams:
  - name: a
    request: { type: rest, path: /a }
"#;
    let err = load_source_from_str(yaml).unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[test]
fn test_rest_request_on_graphql_provider_rejected() {
    let yaml = r#"
name: x
base_url: https://api.example.com
provider: { type: shopify_graphql }
retry:
  max_retries: 1
streams:
  - name: a
    request: { type: rest, path: /a }
"#;
    let err = load_source_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("graphql request"));
}

#[test]
fn test_entity_reused_across_streams_rejected() {
    let yaml = r#"
name: x
base_url: https://api.example.com
retry:
  max_retries: 1
streams:
  - name: a
    request: { type: rest, path: /a }
    schema: { name: shared }
  - name: b
    request: { type: rest, path: /b }
    schema: { name: shared }
"#;
    let err = load_source_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("more than one stream"));
}

#[test]
fn test_load_source_unknown_name_lists_builtins() {
    let err = load_source("definitely-not-a-source").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("not found"));
    assert!(message.contains("shopify"));
}

#[test]
fn test_load_source_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faire.yaml");
    std::fs::write(&path, FAIRE_YAML).unwrap();

    let def = load_source(&path).unwrap();
    assert_eq!(def.name, "faire");
}

#[test]
fn test_builtin_sources_parse() {
    for name in connectors::list_builtin() {
        let def = load_source(name).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert!(!def.streams.is_empty(), "{name}");
    }

    let faire = load_source("faire").unwrap();
    assert_eq!(
        faire.budget,
        BudgetStrategy::RequestCeiling {
            max_requests: 1000,
            window_secs: 3600,
        }
    );
}

// ============================================================================
// Auth Resolution Tests
// ============================================================================

#[test]
fn test_auth_resolution_renders_templates() {
    let def = load_source_from_str(FAIRE_YAML).unwrap();
    let auth = def.auth.resolve(&faire_ctx()).unwrap();
    match auth {
        AuthConfig::FaireApp { application_id, .. } => assert_eq!(application_id, "apa_1"),
        other => panic!("expected faire auth, got {}", other.kind()),
    }
}

#[test]
fn test_auth_resolution_missing_env_is_config_error() {
    let def = load_source_from_str(FAIRE_YAML).unwrap();
    let err = def.auth.resolve(&TemplateContext::new()).unwrap_err();
    assert!(matches!(err, Error::UndefinedVariable { .. }));
    assert!(err.is_config());
}

#[test]
fn test_refresh_token_blank_access_token_is_none() {
    let auth = AuthDefinition::RefreshToken {
        refresh_url: "https://auth.example.com/refresh".to_string(),
        refresh_token: "{{ env.RT }}".to_string(),
        access_token: Some("{{ config.token }}".to_string()),
    };
    let ctx = TemplateContext::with_config(json!({"token": ""})).env_var("RT", "r1");
    match auth.resolve(&ctx).unwrap() {
        AuthConfig::RefreshToken { access_token, .. } => assert!(access_token.is_none()),
        other => panic!("expected refresh token auth, got {}", other.kind()),
    }
}

#[test]
fn test_source_new_rejects_blank_credentials() {
    let def = load_source_from_str(FAIRE_YAML).unwrap();
    let ctx = faire_ctx().env_var("FAIRE_ACCESS_TOKEN", " ");
    let err = Source::new(def, ctx).unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
}

#[test]
fn test_source_new_with_valid_credentials() {
    let def = load_source_from_str(FAIRE_YAML).unwrap();
    let source = Source::new(def, faire_ctx()).unwrap();
    assert_eq!(source.name(), "faire");
}

// ============================================================================
// Fetcher Building Tests
// ============================================================================

fn faire_source(responses: Vec<TransportResponse>) -> (Source, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new(responses);
    let def = load_source_from_str(FAIRE_YAML).unwrap();
    let source = Source::with_transport(def, faire_ctx(), transport.clone());
    (source, transport)
}

fn options() -> FetchOptions {
    FetchOptions {
        sleeper: Some(Arc::new(RecordingSleeper::new())),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetcher_applies_start_date_on_first_call_only() {
    let (source, transport) = faire_source(vec![
        TransportResponse::new(200, json!({"orders": [{"id": "o1"}], "cursor": "c1"})),
        TransportResponse::new(200, json!({"orders": [{"id": "o2"}], "cursor": null})),
    ]);
    let stream = source.definition().stream("orders").unwrap();

    let pages = collect(source.fetcher(stream, &options()).unwrap()).await;
    assert_eq!(pages.len(), 2);

    let requests = transport.requests();
    assert_eq!(requests[0].path, "/orders");
    assert_eq!(
        requests[0].query_value("updated_at_min"),
        Some("2024-01-01T00:00:00Z")
    );
    assert_eq!(requests[0].query_value("limit"), Some("50"));
    assert_eq!(requests[1].query_value("updated_at_min"), None);
    assert_eq!(requests[1].query_value("cursor"), Some("c1"));
    assert_eq!(requests[1].query_value("limit"), Some("50"));
}

#[tokio::test]
async fn test_fetcher_since_option_overrides_start_date() {
    let (source, transport) = faire_source(vec![TransportResponse::new(
        200,
        json!({"orders": [], "cursor": null}),
    )]);
    let stream = source.definition().stream("orders").unwrap();
    let options = FetchOptions {
        since: Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
        ..options()
    };

    collect(source.fetcher(stream, &options).unwrap()).await;
    assert_eq!(
        transport.requests()[0].query_value("updated_at_min"),
        Some("2024-06-01T12:00:00Z")
    );
}

#[tokio::test]
async fn test_fetcher_without_start_date_sends_no_filter() {
    let def = load_source_from_str(FAIRE_YAML).unwrap();
    let ctx = TemplateContext {
        config: json!({}),
        ..faire_ctx()
    };
    let transport = ScriptedTransport::new(vec![TransportResponse::new(
        200,
        json!({"orders": [{"id": "o1"}]}),
    )]);
    let source = Source::with_transport(def, ctx, transport.clone());
    let stream = source.definition().stream("orders").unwrap();

    collect(source.fetcher(stream, &options()).unwrap()).await;
    assert_eq!(transport.requests()[0].query_value("updated_at_min"), None);
}

#[test]
fn test_fetcher_rejects_unparseable_start_date() {
    let def = load_source_from_str(FAIRE_YAML).unwrap();
    let ctx = TemplateContext {
        config: json!({"start_date": "yesterday-ish"}),
        ..faire_ctx()
    };
    let source = Source::with_transport(def, ctx, ScriptedTransport::new(vec![]));
    let stream = source.definition().stream("orders").unwrap();
    let err = source.fetcher(stream, &options()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}

#[tokio::test]
async fn test_fetcher_renders_graphql_variables() {
    let yaml = r#"
name: shiphero
base_url: https://public-api.shiphero.com
provider: { type: shiphero }
retry:
  max_retries: 2
budget: { type: fixed_delay, min_delay_ms: 0 }
streams:
  - name: products
    request:
      type: graphql
      query: "query { products { data { edges { node { id } } } } }"
      variables:
        warehouse_id: "{{ config.warehouse }}"
        first: "{{ config.page }}"
    records_path: data.products.data.edges
    pagination:
      type: graphql_connection
      connection_path: data.products.data
    cursor_param: after
"#;
    let def = load_source_from_str(yaml).unwrap();
    let transport = ScriptedTransport::new(vec![TransportResponse::new(
        200,
        json!({"data": {"products": {"data": {
            "edges": [{"node": {"id": "p1"}}],
            "pageInfo": {"hasNextPage": false, "endCursor": null}
        }}}}),
    )]);
    let ctx = TemplateContext::with_config(json!({"warehouse": "V2FyZWhvdXNlOjE=", "page": 25}));
    let source = Source::with_transport(def, ctx, transport.clone());
    let stream = source.definition().stream("products").unwrap();

    let pages = collect(source.fetcher(stream, &options()).unwrap()).await;
    assert_eq!(pages[0].records, vec![json!({"id": "p1"})]);

    let variables = transport.requests()[0].variables().cloned().unwrap();
    assert_eq!(variables, json!({"warehouse_id": "V2FyZWhvdXNlOjE=", "first": 25}));
}

#[test]
fn test_select_streams() {
    let (source, _) = faire_source(vec![]);
    assert_eq!(source.select_streams(&[]).unwrap().len(), 1);
    assert_eq!(
        source.select_streams(&["orders".to_string()]).unwrap()[0].name,
        "orders"
    );
    let err = source.select_streams(&["nope".to_string()]).unwrap_err();
    assert!(err.to_string().contains("Available: orders"));
}
