//! End-to-end scenarios against a live ERPNext server.
//!
//! These tests need `ERPNEXT_URL`, `ERPNEXT_API_KEY` and
//! `ERPNEXT_API_SECRET` in the environment and create/delete real records
//! on the target site. Run them explicitly:
//!
//! ```text
//! cargo test --test live_tests -- --ignored --test-threads 1
//! ```

use erpnext_mcp::client::{ClientError, ErpNextClient};
use erpnext_mcp::config::Config;
use erpnext_mcp::types::ListQuery;
use serde_json::{json, Value};
use uuid::Uuid;

fn live_client() -> ErpNextClient {
    let config = Config::from_env().expect("ERPNEXT_* environment must be set for live tests");
    ErpNextClient::new(config).expect("client construction")
}

async fn create_test_item(client: &ErpNextClient, code: &str) -> String {
    let created = client
        .create_doc(
            "Item",
            &json!({
                "item_code": code,
                "item_name": code,
                "item_group": "All Item Groups",
                "stock_uom": "Nos",
            }),
        )
        .await
        .expect("create item");
    created
        .get("name")
        .and_then(Value::as_str)
        .expect("created item has a name")
        .to_string()
}

#[tokio::test]
#[ignore = "requires a live ERPNext server"]
async fn document_lifecycle() {
    let client = live_client();
    let code = format!("TEST-ITEM-{}", Uuid::new_v4().simple());

    let name = create_test_item(&client, &code).await;
    assert_eq!(name, code);

    let fetched = client
        .get_doc("Item", &name, None)
        .await
        .expect("get after create");
    assert_eq!(
        fetched.get("name").and_then(Value::as_str),
        Some(name.as_str())
    );

    let rows = client
        .get_list("Item", ListQuery::new().with_filters(json!({ "name": name })))
        .await
        .expect("filtered list");
    assert_eq!(rows.len(), 1);

    let count = client
        .get_count("Item", Some(&json!({ "name": name })))
        .await
        .expect("count");
    assert_eq!(count, 1);

    client.delete_doc("Item", &name).await.expect("delete");
    assert!(
        client.get_doc("Item", &name, None).await.is_err(),
        "get after delete must fail"
    );
}

#[tokio::test]
#[ignore = "requires a live ERPNext server"]
async fn update_is_visible_on_get() {
    let client = live_client();
    let code = format!("TEST-ITEM-{}", Uuid::new_v4().simple());
    let name = create_test_item(&client, &code).await;

    client
        .update_doc("Item", &name, &json!({ "description": "updated description" }))
        .await
        .expect("update");
    let fetched = client.get_doc("Item", &name, None).await.expect("get");
    assert_eq!(
        fetched.get("description").and_then(Value::as_str),
        Some("updated description")
    );

    client.delete_doc("Item", &name).await.expect("delete");
}

#[tokio::test]
#[ignore = "requires a live ERPNext server"]
async fn list_respects_page_length() {
    let client = live_client();
    let rows = client
        .get_list(
            "DocType",
            ListQuery::new().with_fields(["name"]).with_page_length(5),
        )
        .await
        .expect("list");
    assert!(rows.len() <= 5);
}

#[tokio::test]
#[ignore = "requires a live ERPNext server"]
async fn search_link_finds_created_item() {
    let client = live_client();
    let code = format!("TEST-ITEM-{}", Uuid::new_v4().simple());
    let name = create_test_item(&client, &code).await;

    let hits = client
        .search_link("Item", &code, None, 20)
        .await
        .expect("search");
    let found = hits.iter().any(|hit| {
        ["value", "name"].iter().any(|key| {
            hit.get(*key)
                .and_then(Value::as_str)
                .is_some_and(|v| v.contains(&code))
        })
    });
    assert!(found, "search_link must surface the created item");

    client.delete_doc("Item", &name).await.expect("delete");
}

#[tokio::test]
#[ignore = "requires a live ERPNext server"]
async fn submit_on_missing_document_fails() {
    let client = live_client();
    let missing = format!("SO-{}", Uuid::new_v4().simple());
    let result = client.submit_doc("Sales Order", &missing).await;
    assert!(matches!(result, Err(ClientError::Api { .. })));
}

#[tokio::test]
#[ignore = "requires a live ERPNext server"]
async fn file_roundtrip() {
    let client = live_client();
    let filename = format!("x-{}.txt", Uuid::new_v4().simple());

    let uploaded = client
        .upload_file(b"hello".to_vec(), &filename, None, None, true)
        .await
        .expect("upload");
    assert_eq!(uploaded.file_name.as_deref(), Some(filename.as_str()));

    let rows = client
        .get_list(
            "File",
            ListQuery::new()
                .with_fields(["name", "file_name"])
                .with_filters(json!({ "file_name": filename })),
        )
        .await
        .expect("list files");
    assert_eq!(rows.len(), 1);

    let url = client.get_file_url(&uploaded.name).await.expect("file url");
    assert!(!url.is_empty());

    let (content, original) = client
        .download_file(&uploaded.name)
        .await
        .expect("download");
    assert_eq!(content.as_ref(), b"hello");
    assert_eq!(original, filename);

    client
        .delete_doc("File", &uploaded.name)
        .await
        .expect("delete uploaded file");
}

#[tokio::test]
#[ignore = "requires a live ERPNext server"]
async fn attached_file_is_listed_for_its_document() {
    let client = live_client();
    let code = format!("TEST-ITEM-{}", Uuid::new_v4().simple());
    let name = create_test_item(&client, &code).await;
    let filename = format!("attached-{}.txt", Uuid::new_v4().simple());

    let uploaded = client
        .upload_file(
            b"attached content".to_vec(),
            &filename,
            Some("Item"),
            Some(&name),
            true,
        )
        .await
        .expect("upload attached");
    assert_eq!(uploaded.attached_to_doctype.as_deref(), Some("Item"));
    assert_eq!(uploaded.attached_to_name.as_deref(), Some(name.as_str()));

    let files = client
        .list_files(Some("Item"), Some(&name), None, 20)
        .await
        .expect("list attached");
    assert!(files.iter().any(|f| f.name == uploaded.name));

    client
        .delete_doc("File", &uploaded.name)
        .await
        .expect("delete file");
    client.delete_doc("Item", &name).await.expect("delete item");
}
