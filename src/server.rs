//! MCP tool surface over the ERPNext adapter.
//!
//! One callable per remote capability. Structured inputs (filters, field
//! lists, document data) are accepted as native JSON values and re-encoded
//! to the server's wire conventions inside the adapter. Tool outputs are
//! JSON-serialized text content.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Method;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::client::{ClientError, ErpNextClient};
use crate::types::{is_filter_shaped, ListQuery};

fn internal(err: ClientError) -> ErrorData {
    ErrorData::internal_error(err.to_string(), None)
}

fn invalid(message: impl Into<String>) -> ErrorData {
    ErrorData::invalid_params(message.into(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Accept a filter expression or reject it before any network call.
fn checked_filters(filters: Option<Value>, field: &str) -> Result<Option<Value>, ErrorData> {
    match filters {
        None | Some(Value::Null) => Ok(None),
        Some(value) if is_filter_shaped(&value) => Ok(Some(value)),
        Some(value) => Err(invalid(format!(
            "{field} must be a field-to-value object or a list of [field, operator, value] triples, got: {value}"
        ))),
    }
}

fn default_true() -> bool {
    true
}

// --- Tool parameters ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDocumentsParams {
    #[schemars(description = "DocType name, e.g. \"Sales Order\" or \"Customer\"")]
    pub doctype: String,
    #[schemars(description = "Field names to return; the server defaults to [\"name\"]")]
    pub fields: Option<Vec<String>>,
    #[schemars(description = "Filters: {\"status\": \"Open\"} or [[\"status\", \"=\", \"Open\"]]")]
    pub filters: Option<Value>,
    #[schemars(description = "OR-combined filters, same shape as filters")]
    pub or_filters: Option<Value>,
    #[schemars(description = "Sort expression, e.g. \"creation desc\"")]
    pub order_by: Option<String>,
    #[serde(default)]
    #[schemars(description = "Pagination offset")]
    pub limit_start: u64,
    #[schemars(description = "Number of records to return (default 20, 0 for no limit)")]
    pub limit_page_length: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetDocumentParams {
    #[schemars(description = "DocType name")]
    pub doctype: String,
    #[schemars(description = "Document name/ID")]
    pub name: String,
    #[schemars(description = "Optional field names to return")]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateDocumentParams {
    #[schemars(description = "DocType name")]
    pub doctype: String,
    #[schemars(description = "Field values, e.g. {\"customer_name\": \"Test\"}")]
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateDocumentParams {
    #[schemars(description = "DocType name")]
    pub doctype: String,
    #[schemars(description = "Document name/ID")]
    pub name: String,
    #[schemars(description = "Fields to update")]
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DocumentRefParams {
    #[schemars(description = "DocType name")]
    pub doctype: String,
    #[schemars(description = "Document name/ID")]
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RunReportParams {
    #[schemars(description = "Name of the report")]
    pub report_name: String,
    #[schemars(description = "Optional report filters")]
    pub filters: Option<Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetCountParams {
    #[schemars(description = "DocType name")]
    pub doctype: String,
    #[schemars(description = "Optional filters")]
    pub filters: Option<Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListWithSummaryParams {
    #[schemars(description = "DocType name")]
    pub doctype: String,
    #[schemars(description = "Field names to return")]
    pub fields: Option<Vec<String>>,
    #[schemars(description = "Optional filters")]
    pub filters: Option<Value>,
    #[schemars(description = "Sort expression")]
    pub order_by: Option<String>,
    #[schemars(description = "Number of records (default 20)")]
    pub limit_page_length: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RunMethodParams {
    #[schemars(
        description = "Dotted method path, e.g. \"frappe.client.get_list\". Caller-controlled; carries the same trust level as direct API access"
    )]
    pub method: String,
    #[schemars(description = "GET or POST (default POST)")]
    pub http_method: Option<String>,
    #[schemars(description = "Keyword arguments for the method")]
    pub args: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDoctypesParams {
    #[schemars(description = "Optional module filter, e.g. \"Selling\", \"Stock\", \"Accounts\"")]
    pub module: Option<String>,
    #[schemars(description = "Only doctypes that support the submit workflow")]
    pub is_submittable: Option<bool>,
    #[schemars(description = "Max results (default 100)")]
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchLinkParams {
    #[schemars(description = "DocType to search in")]
    pub doctype: String,
    #[schemars(description = "Search text")]
    pub txt: String,
    #[schemars(description = "Optional filters")]
    pub filters: Option<Value>,
    #[schemars(description = "Max results (default 20)")]
    pub page_length: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DoctypeMetaParams {
    #[schemars(description = "DocType name")]
    pub doctype: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StockBalanceParams {
    #[schemars(description = "Optional item code to filter")]
    pub item_code: Option<String>,
    #[schemars(description = "Optional warehouse to filter")]
    pub warehouse: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ItemPriceParams {
    #[schemars(description = "Item code to look up")]
    pub item_code: String,
    #[schemars(description = "Optional price list name, e.g. \"Standard Selling\"")]
    pub price_list: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StockLedgerParams {
    #[schemars(description = "Optional item code filter")]
    pub item_code: Option<String>,
    #[schemars(description = "Optional warehouse filter")]
    pub warehouse: Option<String>,
    #[schemars(description = "Max records to return (default 50)")]
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MakeMappedDocParams {
    #[schemars(
        description = "Dotted path of the mapping method, e.g. \"erpnext.selling.doctype.sales_order.sales_order.make_delivery_note\""
    )]
    pub method: String,
    #[schemars(description = "Name/ID of the source document")]
    pub source_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PartyBalanceParams {
    #[schemars(description = "\"Customer\" or \"Supplier\"")]
    pub party_type: String,
    #[schemars(description = "Party name/ID")]
    pub party: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UploadFileParams {
    #[schemars(description = "File content encoded as base64")]
    pub file_content_base64: String,
    #[schemars(description = "Name for the uploaded file, e.g. \"report.pdf\"")]
    pub filename: String,
    #[schemars(description = "Optional DocType to attach the file to")]
    pub attached_to_doctype: Option<String>,
    #[schemars(description = "Optional document name to attach the file to")]
    pub attached_to_name: Option<String>,
    #[serde(default = "default_true")]
    #[schemars(description = "Whether the file is private (default true)")]
    pub is_private: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UploadFileFromUrlParams {
    #[schemars(description = "Source URL the server fetches the file from")]
    pub file_url: String,
    #[schemars(description = "Optional name for the file (inferred from the URL if absent)")]
    pub filename: Option<String>,
    #[schemars(description = "Optional DocType to attach the file to")]
    pub attached_to_doctype: Option<String>,
    #[schemars(description = "Optional document name to attach the file to")]
    pub attached_to_name: Option<String>,
    #[serde(default = "default_true")]
    #[schemars(description = "Whether the file is private (default true)")]
    pub is_private: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFilesParams {
    #[schemars(description = "Filter by attached DocType")]
    pub attached_to_doctype: Option<String>,
    #[schemars(description = "Filter by attached document name")]
    pub attached_to_name: Option<String>,
    #[schemars(description = "Filter by privacy (true = private, false = public, absent = all)")]
    pub is_private: Option<bool>,
    #[schemars(description = "Max number of files to return (default 20)")]
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FileNameParams {
    #[schemars(description = "The File document name")]
    pub file_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PartyDetailsParams {
    #[schemars(description = "Exact party name/ID")]
    pub name: Option<String>,
    #[schemars(description = "Search keyword used when no exact name is given")]
    pub keyword: Option<String>,
}

/// MCP tool registry over a shared [`ErpNextClient`].
///
/// The adapter is constructed once at startup and shared behind an `Arc`;
/// callers needing concurrency-safety get it from the pooled HTTP session,
/// not from any per-tool state.
#[derive(Clone)]
pub struct ErpNextTools {
    client: Arc<ErpNextClient>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ErpNextTools {
    pub fn new(client: ErpNextClient) -> Self {
        Self {
            client: Arc::new(client),
            tool_router: Self::tool_router(),
        }
    }

    // --- CRUD ---

    #[tool(
        description = "List documents of a DocType with optional filtering, sorting and pagination"
    )]
    async fn list_documents(
        &self,
        Parameters(p): Parameters<ListDocumentsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut query = ListQuery::new().with_limit_start(p.limit_start);
        if let Some(fields) = p.fields {
            query = query.with_fields(fields);
        }
        if let Some(filters) = checked_filters(p.filters, "filters")? {
            query = query.with_filters(filters);
        }
        if let Some(or_filters) = checked_filters(p.or_filters, "or_filters")? {
            query = query.with_or_filters(or_filters);
        }
        if let Some(order_by) = p.order_by {
            query = query.with_order_by(order_by);
        }
        if let Some(length) = p.limit_page_length {
            query = query.with_page_length(length);
        }
        let rows = self
            .client
            .get_list(&p.doctype, query)
            .await
            .map_err(internal)?;
        json_result(&rows)
    }

    #[tool(description = "Get a single document by DocType and name")]
    async fn get_document(
        &self,
        Parameters(p): Parameters<GetDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let doc = self
            .client
            .get_doc(&p.doctype, &p.name, p.fields.as_deref())
            .await
            .map_err(internal)?;
        json_result(&doc)
    }

    #[tool(description = "Create a new document")]
    async fn create_document(
        &self,
        Parameters(p): Parameters<CreateDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let doc = self
            .client
            .create_doc(&p.doctype, &Value::Object(p.data))
            .await
            .map_err(internal)?;
        json_result(&doc)
    }

    #[tool(description = "Update an existing document")]
    async fn update_document(
        &self,
        Parameters(p): Parameters<UpdateDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let doc = self
            .client
            .update_doc(&p.doctype, &p.name, &Value::Object(p.data))
            .await
            .map_err(internal)?;
        json_result(&doc)
    }

    #[tool(description = "Delete a document")]
    async fn delete_document(
        &self,
        Parameters(p): Parameters<DocumentRefParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .client
            .delete_doc(&p.doctype, &p.name)
            .await
            .map_err(internal)?;
        json_result(&result)
    }

    // --- Reports ---

    #[tool(description = "Execute an ERPNext report")]
    async fn run_report(
        &self,
        Parameters(p): Parameters<RunReportParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let filters = checked_filters(p.filters, "filters")?;
        let result = self
            .client
            .run_report(&p.report_name, filters.as_ref())
            .await
            .map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Get document count for a DocType with optional filters")]
    async fn get_count(
        &self,
        Parameters(p): Parameters<GetCountParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let filters = checked_filters(p.filters, "filters")?;
        let count = self
            .client
            .get_count(&p.doctype, filters.as_ref())
            .await
            .map_err(internal)?;
        json_result(&count)
    }

    #[tool(description = "Get a list of documents along with the total match count")]
    async fn get_list_with_summary(
        &self,
        Parameters(p): Parameters<ListWithSummaryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let filters = checked_filters(p.filters, "filters")?;
        let mut query = ListQuery::new();
        if let Some(fields) = p.fields {
            query = query.with_fields(fields);
        }
        if let Some(filters) = filters.clone() {
            query = query.with_filters(filters);
        }
        if let Some(order_by) = p.order_by {
            query = query.with_order_by(order_by);
        }
        if let Some(length) = p.limit_page_length {
            query = query.with_page_length(length);
        }
        let docs = self
            .client
            .get_list(&p.doctype, query)
            .await
            .map_err(internal)?;
        let count = self
            .client
            .get_count(&p.doctype, filters.as_ref())
            .await
            .map_err(internal)?;
        json_result(&json!({ "data": docs, "total_count": count }))
    }

    // --- Workflow ---

    #[tool(description = "Submit a submittable document (e.g. Sales Invoice)")]
    async fn submit_document(
        &self,
        Parameters(p): Parameters<DocumentRefParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .client
            .submit_doc(&p.doctype, &p.name)
            .await
            .map_err(internal)?;
        json_result(&result)
    }

    #[tool(description = "Cancel a submitted document")]
    async fn cancel_document(
        &self,
        Parameters(p): Parameters<DocumentRefParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .client
            .cancel_doc(&p.doctype, &p.name)
            .await
            .map_err(internal)?;
        json_result(&result)
    }

    #[tool(
        description = "Call a whitelisted server-side method by dotted name; the universal fallback for capabilities not otherwise wrapped"
    )]
    async fn run_method(
        &self,
        Parameters(p): Parameters<RunMethodParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let verb = match p.http_method.as_deref() {
            None => Method::POST,
            Some(m) if m.eq_ignore_ascii_case("post") => Method::POST,
            Some(m) if m.eq_ignore_ascii_case("get") => Method::GET,
            Some(other) => return Err(invalid(format!("http_method must be GET or POST, got {other}"))),
        };
        let args = p.args.unwrap_or_default();
        let result = self
            .client
            .call_method(&p.method, verb, &args)
            .await
            .map_err(internal)?;
        json_result(&result)
    }

    // --- Helpers ---

    #[tool(description = "List available DocType names")]
    async fn list_doctypes(
        &self,
        Parameters(p): Parameters<ListDoctypesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut filters = Map::new();
        if let Some(module) = p.module {
            filters.insert("module".to_string(), Value::String(module));
        }
        if let Some(is_submittable) = p.is_submittable {
            filters.insert(
                "is_submittable".to_string(),
                json!(if is_submittable { 1 } else { 0 }),
            );
        }
        let mut query = ListQuery::new()
            .with_fields(["name"])
            .with_order_by("name asc")
            .with_page_length(p.limit.unwrap_or(100));
        if !filters.is_empty() {
            query = query.with_filters(Value::Object(filters));
        }
        let rows = self
            .client
            .get_list("DocType", query)
            .await
            .map_err(internal)?;
        let names: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get("name").and_then(Value::as_str))
            .collect();
        json_result(&names)
    }

    #[tool(description = "Search for link field values (autocomplete)")]
    async fn search_link(
        &self,
        Parameters(p): Parameters<SearchLinkParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let filters = checked_filters(p.filters, "filters")?;
        let hits = self
            .client
            .search_link(&p.doctype, &p.txt, filters.as_ref(), p.page_length.unwrap_or(20))
            .await
            .map_err(internal)?;
        json_result(&hits)
    }

    #[tool(description = "Get field definitions for a DocType")]
    async fn get_doctype_meta(
        &self,
        Parameters(p): Parameters<DoctypeMetaParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let meta = self
            .client
            .get_doctype_meta(&p.doctype)
            .await
            .map_err(internal)?;
        json_result(&meta)
    }

    // --- Inventory & trading ---

    #[tool(description = "Get real-time stock balance from Bin")]
    async fn get_stock_balance(
        &self,
        Parameters(p): Parameters<StockBalanceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let bins = self
            .client
            .get_stock_balance(p.item_code.as_deref(), p.warehouse.as_deref())
            .await
            .map_err(internal)?;
        json_result(&bins)
    }

    #[tool(description = "Get item prices from Item Price records")]
    async fn get_item_price(
        &self,
        Parameters(p): Parameters<ItemPriceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let prices = self
            .client
            .get_item_price(&p.item_code, p.price_list.as_deref())
            .await
            .map_err(internal)?;
        json_result(&prices)
    }

    #[tool(description = "Get stock ledger entries (inventory transaction history)")]
    async fn get_stock_ledger(
        &self,
        Parameters(p): Parameters<StockLedgerParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let entries = self
            .client
            .get_stock_ledger(
                p.item_code.as_deref(),
                p.warehouse.as_deref(),
                p.limit.unwrap_or(50),
            )
            .await
            .map_err(internal)?;
        json_result(&entries)
    }

    #[tool(
        description = "Create a new document mapped from an existing one (document conversion, e.g. Sales Order to Delivery Note)"
    )]
    async fn make_mapped_doc(
        &self,
        Parameters(p): Parameters<MakeMappedDocParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let doc = self
            .client
            .make_mapped_doc(&p.method, &p.source_name)
            .await
            .map_err(internal)?;
        json_result(&doc)
    }

    #[tool(description = "Get outstanding balance for a Customer or Supplier")]
    async fn get_party_balance(
        &self,
        Parameters(p): Parameters<PartyBalanceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let balance = self
            .client
            .get_party_balance(&p.party_type, &p.party)
            .await
            .map_err(internal)?;
        json_result(&balance)
    }

    // --- Files ---

    #[tool(description = "Upload a file, optionally attaching it to a document")]
    async fn upload_file(
        &self,
        Parameters(p): Parameters<UploadFileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let content = BASE64
            .decode(&p.file_content_base64)
            .map_err(|e| invalid(format!("file_content_base64 is not valid base64: {e}")))?;
        let record = self
            .client
            .upload_file(
                content,
                &p.filename,
                p.attached_to_doctype.as_deref(),
                p.attached_to_name.as_deref(),
                p.is_private,
            )
            .await
            .map_err(internal)?;
        json_result(&record)
    }

    #[tool(description = "Upload a file fetched by the server from a URL")]
    async fn upload_file_from_url(
        &self,
        Parameters(p): Parameters<UploadFileFromUrlParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let record = self
            .client
            .upload_file_from_url(
                &p.file_url,
                p.filename.as_deref(),
                p.attached_to_doctype.as_deref(),
                p.attached_to_name.as_deref(),
                p.is_private,
            )
            .await
            .map_err(internal)?;
        json_result(&record)
    }

    #[tool(description = "List stored files, optionally filtered by attachment")]
    async fn list_files(
        &self,
        Parameters(p): Parameters<ListFilesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let files = self
            .client
            .list_files(
                p.attached_to_doctype.as_deref(),
                p.attached_to_name.as_deref(),
                p.is_private,
                p.limit.unwrap_or(20),
            )
            .await
            .map_err(internal)?;
        json_result(&files)
    }

    #[tool(description = "Get the full download URL for a stored file")]
    async fn get_file_url(
        &self,
        Parameters(p): Parameters<FileNameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let url = self
            .client
            .get_file_url(&p.file_name)
            .await
            .map_err(internal)?;
        json_result(&url)
    }

    #[tool(description = "Download a file's content as base64")]
    async fn download_file(
        &self,
        Parameters(p): Parameters<FileNameParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (content, filename) = self
            .client
            .download_file(&p.file_name)
            .await
            .map_err(internal)?;
        json_result(&json!({
            "content_base64": BASE64.encode(&content),
            "filename": filename,
        }))
    }

    // --- Party details ---

    #[tool(
        description = "Get complete supplier details including address, phone and contacts"
    )]
    async fn get_supplier_details(
        &self,
        Parameters(p): Parameters<PartyDetailsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.party_details("Supplier", "supplier_group", "country", p)
            .await
    }

    #[tool(
        description = "Get complete customer details including address, phone and contacts"
    )]
    async fn get_customer_details(
        &self,
        Parameters(p): Parameters<PartyDetailsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.party_details("Customer", "customer_group", "territory", p)
            .await
    }
}

impl ErpNextTools {
    /// Aggregated party lookup: record, primary address, and contacts
    /// split into own staff (those with a designation) and the party's own
    /// people.
    async fn party_details(
        &self,
        doctype: &str,
        group_field: &str,
        region_field: &str,
        p: PartyDetailsParams,
    ) -> Result<CallToolResult, ErrorData> {
        let record = match (p.name, p.keyword) {
            (Some(name), _) => self
                .client
                .get_doc(doctype, &name, None)
                .await
                .map_err(internal)?,
            (None, Some(keyword)) => {
                let hits = self
                    .client
                    .get_list(
                        doctype,
                        ListQuery::new()
                            .with_fields(["name"])
                            .with_filters(json!({ "name": ["like", format!("%{keyword}%")] }))
                            .with_page_length(1),
                    )
                    .await
                    .map_err(internal)?;
                let Some(found) = hits
                    .first()
                    .and_then(|hit| hit.get("name"))
                    .and_then(Value::as_str)
                else {
                    return Ok(CallToolResult::error(vec![Content::text(format!(
                        "no {doctype} matching keyword {keyword:?}"
                    ))]));
                };
                self.client
                    .get_doc(doctype, found, None)
                    .await
                    .map_err(internal)?
            }
            (None, None) => return Err(invalid("either name or keyword is required")),
        };

        let party_name = record
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        // Address titles follow the "<code> <label>" convention, where the
        // code is the part of the party name before " - ".
        let code = party_name
            .split(" - ")
            .next()
            .unwrap_or(party_name.as_str());
        let addresses = self
            .client
            .get_list(
                "Address",
                ListQuery::new()
                    .with_fields([
                        "address_title",
                        "address_line1",
                        "city",
                        "pincode",
                        "phone",
                        "fax",
                    ])
                    .with_filters(json!({ "address_title": ["like", format!("%{code}%")] }))
                    .with_page_length(5),
            )
            .await
            .map_err(internal)?;

        let contacts = self
            .client
            .get_list(
                "Contact",
                ListQuery::new()
                    .with_fields([
                        "name",
                        "first_name",
                        "designation",
                        "phone",
                        "mobile_no",
                        "email_id",
                    ])
                    .with_filters(json!([["Dynamic Link", "link_name", "=", party_name]]))
                    .with_page_length(50),
            )
            .await
            .map_err(internal)?;

        let mut our_contacts = Vec::new();
        let mut their_contacts = Vec::new();
        for contact in &contacts {
            let get = |field: &str| {
                contact
                    .get(field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let designation = get("designation");
            let phone = match get("phone") {
                p if p.is_empty() => get("mobile_no"),
                p => p,
            };
            let name = match get("first_name") {
                n if n.is_empty() => get("name"),
                n => n,
            };
            let info = json!({
                "name": name,
                "designation": designation,
                "phone": phone,
                "email": get("email_id"),
            });
            if designation.is_empty() {
                their_contacts.push(info);
            } else {
                our_contacts.push(info);
            }
        }

        json_result(&json!({
            doctype.to_lowercase(): {
                "name": party_name,
                "group": record.get(group_field),
                region_field: record.get(region_field),
                "currency": record.get("default_currency"),
            },
            "address": addresses.first(),
            "our_contacts": our_contacts,
            "their_contacts": their_contacts,
        }))
    }
}

#[tool_handler]
impl ServerHandler for ErpNextTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "erpnext-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "MCP server for the ERPNext REST API - CRUD, reports, workflow and file operations"
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}
