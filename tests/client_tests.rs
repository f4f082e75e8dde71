use std::time::Duration;

use erpnext_mcp::client::{ClientError, ErpNextClient};
use erpnext_mcp::config::{Config, ConnectOptions, DEFAULT_URL};
use erpnext_mcp::types::{
    encode_query_value, is_filter_shaped, resolve_file_url, ApiResponse, FileRecord, ListQuery,
};
use serde_json::json;

#[test]
fn config_trims_trailing_slash() {
    let config = Config::new("http://erp.example.com/", "key", "secret");
    assert_eq!(config.url, "http://erp.example.com");
}

#[test]
fn config_from_env_requires_credentials() {
    // env mutation is process-wide, so every variant lives in one test
    std::env::remove_var("ERPNEXT_URL");
    std::env::remove_var("ERPNEXT_API_KEY");
    std::env::remove_var("ERPNEXT_API_SECRET");
    assert!(matches!(Config::from_env(), Err(ClientError::Config(_))));

    std::env::set_var("ERPNEXT_API_KEY", "key");
    assert!(matches!(Config::from_env(), Err(ClientError::Config(_))));

    std::env::set_var("ERPNEXT_API_SECRET", "secret");
    let config = Config::from_env().expect("complete environment");
    assert_eq!(config.url, DEFAULT_URL);
    assert_eq!(config.api_key, "key");
    assert_eq!(config.api_secret, "secret");

    std::env::remove_var("ERPNEXT_API_KEY");
    std::env::remove_var("ERPNEXT_API_SECRET");
}

#[test]
fn client_creation() {
    let client = ErpNextClient::new(Config::new("http://erp.example.com", "key", "secret"))
        .expect("client");
    assert_eq!(client.base_url(), "http://erp.example.com");
}

#[test]
fn client_creation_with_options() {
    let options = ConnectOptions::new()
        .with_timeout(Duration::from_secs(5))
        .with_file_timeout(Duration::from_secs(10))
        .with_header("X-Custom-Header".to_string(), "Value".to_string());
    let client = ErpNextClient::with_options(
        Config::new("http://erp.example.com/", "key", "secret"),
        options,
    )
    .expect("client");
    assert_eq!(client.base_url(), "http://erp.example.com");
}

#[test]
fn client_creation_rejects_invalid_extra_header() {
    let options = ConnectOptions::new().with_header("not a header".to_string(), "x".to_string());
    let result =
        ErpNextClient::with_options(Config::new("http://erp.example.com", "key", "secret"), options);
    assert!(matches!(result, Err(ClientError::Config(_))));
}

#[test]
fn connect_options_defaults() {
    let options = ConnectOptions::default();
    assert_eq!(options.timeout, Duration::from_secs(30));
    assert_eq!(options.file_timeout, Duration::from_secs(60));
    assert!(options.headers.is_none());
}

#[test]
fn list_query_defaults() {
    let query = ListQuery::new();
    assert_eq!(query.limit_start, 0);
    assert_eq!(query.limit_page_length, 20);
    assert!(query.fields.is_none());
    assert!(query.filters.is_none());
    assert!(query.or_filters.is_none());
    assert!(query.order_by.is_none());
}

#[test]
fn list_query_builder() {
    let query = ListQuery::new()
        .with_fields(["name", "status"])
        .with_filters(json!({ "status": "Open" }))
        .with_or_filters(json!([["docstatus", "=", 0]]))
        .with_order_by("creation desc")
        .with_limit_start(40)
        .with_page_length(0);

    assert_eq!(
        query.fields,
        Some(vec!["name".to_string(), "status".to_string()])
    );
    assert_eq!(query.filters, Some(json!({ "status": "Open" })));
    assert_eq!(query.or_filters, Some(json!([["docstatus", "=", 0]])));
    assert_eq!(query.order_by.as_deref(), Some("creation desc"));
    assert_eq!(query.limit_start, 40);
    assert_eq!(query.limit_page_length, 0);
}

#[test]
fn envelope_data_branch() {
    let envelope: ApiResponse =
        serde_json::from_str(r#"{"data": [{"name": "ITEM-0001"}, {"name": "ITEM-0002"}]}"#)
            .expect("parse");
    let rows = envelope.data_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name").and_then(|v| v.as_str()), Some("ITEM-0001"));
}

#[test]
fn envelope_message_branch() {
    let envelope: ApiResponse =
        serde_json::from_str(r#"{"message": 42}"#).expect("parse");
    assert_eq!(envelope.message_or_null(), json!(42));
}

#[test]
fn envelope_error_indicator() {
    let envelope: ApiResponse =
        serde_json::from_str(r#"{"exc_type": "ValidationError", "exc": "Traceback..."}"#)
            .expect("parse");
    assert_eq!(envelope.exc_type.as_deref(), Some("ValidationError"));
    assert!(envelope.data.is_none());
}

#[test]
fn envelope_defaults_when_empty() {
    let envelope: ApiResponse = serde_json::from_str("{}").expect("parse");
    assert_eq!(envelope.clone().data_or_null(), serde_json::Value::Null);
    assert!(envelope.clone().data_rows().is_empty());
    assert_eq!(envelope.message_or_null(), serde_json::Value::Null);
}

#[test]
fn query_value_encoding() {
    // strings pass through verbatim, everything else is JSON-encoded
    assert_eq!(encode_query_value(&json!("Item")), "Item");
    assert_eq!(encode_query_value(&json!(20)), "20");
    assert_eq!(encode_query_value(&json!(true)), "true");
    assert_eq!(
        encode_query_value(&json!({ "parent": "Item" })),
        r#"{"parent":"Item"}"#
    );
    assert_eq!(
        encode_query_value(&json!([["status", "=", "Open"]])),
        r#"[["status","=","Open"]]"#
    );
}

#[test]
fn filter_shapes() {
    assert!(is_filter_shaped(&json!({ "status": "Open" })));
    assert!(is_filter_shaped(&json!([["status", "=", "Open"]])));
    assert!(!is_filter_shaped(&json!("status = Open")));
    assert!(!is_filter_shaped(&json!(1)));
    assert!(!is_filter_shaped(&json!(null)));
}

#[test]
fn file_url_resolution() {
    let base = "http://erp.example.com";
    assert_eq!(
        resolve_file_url(base, "/private/files/x.txt"),
        "http://erp.example.com/private/files/x.txt"
    );
    assert_eq!(
        resolve_file_url(base, "files/x.txt"),
        "http://erp.example.com/files/x.txt"
    );
    assert_eq!(
        resolve_file_url(base, "https://cdn.example.com/x.txt"),
        "https://cdn.example.com/x.txt"
    );
}

#[test]
fn file_record_from_document() {
    // File documents carry many more fields than the record keeps
    let record: FileRecord = serde_json::from_value(json!({
        "name": "a1b2c3",
        "file_name": "report.pdf",
        "file_url": "/private/files/report.pdf",
        "file_size": 1024,
        "attached_to_doctype": "Project",
        "attached_to_name": "PROJ-0001",
        "is_private": 1,
        "owner": "Administrator",
        "docstatus": 0
    }))
    .expect("parse");

    assert_eq!(record.name, "a1b2c3");
    assert_eq!(record.file_name.as_deref(), Some("report.pdf"));
    assert_eq!(record.file_size, Some(1024));
    assert_eq!(record.is_private, Some(1));
}
