use erpnext_mcp::client::ErpNextClient;
use erpnext_mcp::config::Config;
use erpnext_mcp::server::ErpNextTools;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService, ServiceExt};
use serde_json::json;

/// Serve the tool router over an in-memory duplex transport and return the
/// connected client side.
///
/// Port 9 (discard) is never an ERPNext server, so any tool that reaches
/// for the network fails fast with a transport error.
async fn connect() -> RunningService<RoleClient, ()> {
    let config = Config::new("http://127.0.0.1:9", "key", "secret");
    let client = ErpNextClient::new(config).expect("client");
    let tools = ErpNextTools::new(client);

    let (client_transport, server_transport) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let service = tools.serve(server_transport).await.expect("serve");
        let _ = service.waiting().await;
    });
    ().serve(client_transport).await.expect("connect")
}

#[tokio::test]
async fn lists_every_capability() {
    let service = connect().await;
    let listed = service.list_tools(None).await.expect("list_tools");
    let names: Vec<&str> = listed.tools.iter().map(|t| t.name.as_ref()).collect();

    for expected in [
        "list_documents",
        "get_document",
        "create_document",
        "update_document",
        "delete_document",
        "submit_document",
        "cancel_document",
        "run_report",
        "get_count",
        "get_list_with_summary",
        "run_method",
        "list_doctypes",
        "search_link",
        "get_doctype_meta",
        "get_stock_balance",
        "get_item_price",
        "get_stock_ledger",
        "get_party_balance",
        "make_mapped_doc",
        "upload_file",
        "upload_file_from_url",
        "list_files",
        "get_file_url",
        "download_file",
        "get_supplier_details",
        "get_customer_details",
    ] {
        assert!(names.contains(&expected), "missing tool: {expected}");
    }

    service.cancel().await.expect("shutdown");
}

#[tokio::test]
async fn rejects_malformed_filter_before_any_network_call() {
    let service = connect().await;
    let result = service
        .call_tool(CallToolRequestParam {
            name: "list_documents".into(),
            arguments: json!({ "doctype": "Item", "filters": "status = Open" })
                .as_object()
                .cloned(),
        })
        .await;

    let err = result.expect_err("a plain-string filter must be rejected");
    assert!(err.to_string().contains("filters"), "unexpected error: {err}");

    service.cancel().await.expect("shutdown");
}

#[tokio::test]
async fn rejects_unknown_http_verb() {
    let service = connect().await;
    let result = service
        .call_tool(CallToolRequestParam {
            name: "run_method".into(),
            arguments: json!({ "method": "frappe.client.get_count", "http_method": "DELETE" })
                .as_object()
                .cloned(),
        })
        .await;

    let err = result.expect_err("only GET and POST are supported");
    assert!(err.to_string().contains("http_method"), "unexpected error: {err}");

    service.cancel().await.expect("shutdown");
}

#[tokio::test]
async fn rejects_invalid_base64_upload() {
    let service = connect().await;
    let result = service
        .call_tool(CallToolRequestParam {
            name: "upload_file".into(),
            arguments: json!({ "file_content_base64": "not base64!!", "filename": "x.txt" })
                .as_object()
                .cloned(),
        })
        .await;

    assert!(result.is_err());

    service.cancel().await.expect("shutdown");
}

#[tokio::test]
async fn party_details_require_name_or_keyword() {
    let service = connect().await;
    let result = service
        .call_tool(CallToolRequestParam {
            name: "get_supplier_details".into(),
            arguments: json!({}).as_object().cloned(),
        })
        .await;

    let err = result.expect_err("missing name and keyword must be rejected");
    assert!(err.to_string().contains("keyword"), "unexpected error: {err}");

    service.cancel().await.expect("shutdown");
}

#[tokio::test]
async fn transport_failure_surfaces_as_tool_error() {
    let service = connect().await;
    let result = service
        .call_tool(CallToolRequestParam {
            name: "get_document".into(),
            arguments: json!({ "doctype": "Item", "name": "ITEM-0001" })
                .as_object()
                .cloned(),
        })
        .await;

    assert!(result.is_err(), "unreachable server must produce an error");

    service.cancel().await.expect("shutdown");
}
