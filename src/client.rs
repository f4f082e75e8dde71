//! ERPNext REST API adapter.
//!
//! Maps a generic document-store vocabulary (list/get/create/update/delete,
//! workflow transitions, counts, reports, link search, file attachments)
//! onto the fixed `/api/resource` + `/api/method` surface of an ERPNext
//! server, and unwraps the response envelope.

use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::{Config, ConnectOptions};
use crate::http::{build_file_client, build_http_client, RequestBuilderExt, ResponseExt};
use crate::types::{encode_query_value, resolve_file_url, ApiResponse, FileRecord, ListQuery};

// Whitelisted server-side methods used by the wrapped operations.
const METHOD_SUBMIT: &str = "frappe.client.submit";
const METHOD_CANCEL: &str = "frappe.client.cancel";
const METHOD_GET_COUNT: &str = "frappe.client.get_count";
const METHOD_GET_LIST: &str = "frappe.client.get_list";
const METHOD_RUN_REPORT: &str = "frappe.desk.query_report.run";
const METHOD_SEARCH_LINK: &str = "frappe.desk.search.search_link";
const METHOD_PARTY_BALANCE: &str = "erpnext.accounts.utils.get_balance_on";
const METHOD_UPLOAD_FILE: &str = "upload_file";

/// Errors that can occur during adapter operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("server error (HTTP {status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("server response error: {0}")]
    Response(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Stateless adapter around the ERPNext REST + RPC surface.
///
/// The adapter owns one pooled HTTP session for the default operations and
/// opens a separate short-lived session per file transfer, so multipart
/// requests never inherit the shared JSON default headers. Each operation
/// is an independent request/response unit: a single attempt, no retries;
/// any non-2xx status surfaces as [`ClientError::Api`] with the remote
/// status and body verbatim.
#[derive(Debug, Clone)]
pub struct ErpNextClient {
    config: Config,
    options: ConnectOptions,
    http: Client,
}

impl ErpNextClient {
    /// Create an adapter with default transport options.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        Self::with_options(config, ConnectOptions::default())
    }

    /// Create an adapter with custom transport options.
    pub fn with_options(config: Config, options: ConnectOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&config, &options)?;
        Ok(Self {
            config,
            options,
            http,
        })
    }

    /// Server base address, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.config.url
    }

    fn resource_url(&self, doctype: &str, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("{}/api/resource/{}/{}", self.config.url, doctype, name),
            None => format!("{}/api/resource/{}", self.config.url, doctype),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/api/method/{}", self.config.url, method)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text_logged().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        response.json_logged().await
    }

    // --- CRUD ---

    /// List documents of a doctype with optional projection, filtering,
    /// sorting and pagination.
    ///
    /// Returns an empty list, never an error, when nothing matches.
    pub async fn get_list(
        &self,
        doctype: &str,
        query: ListQuery,
    ) -> Result<Vec<Value>, ClientError> {
        let mut params: Vec<(&str, String)> = vec![
            ("limit_start", query.limit_start.to_string()),
            ("limit_page_length", query.limit_page_length.to_string()),
        ];
        if let Some(fields) = &query.fields {
            params.push(("fields", serde_json::to_string(fields)?));
        }
        if let Some(filters) = &query.filters {
            params.push(("filters", serde_json::to_string(filters)?));
        }
        if let Some(or_filters) = &query.or_filters {
            params.push(("or_filters", serde_json::to_string(or_filters)?));
        }
        if let Some(order_by) = &query.order_by {
            params.push(("order_by", order_by.clone()));
        }

        let request = self.http.get(self.resource_url(doctype, None)).query(&params);
        let envelope: ApiResponse = self.send(request).await?;
        Ok(envelope.data_rows())
    }

    /// Get a single document by doctype and name.
    ///
    /// A non-existent name propagates the transport error from the server;
    /// no existence pre-check is performed.
    pub async fn get_doc(
        &self,
        doctype: &str,
        name: &str,
        fields: Option<&[String]>,
    ) -> Result<Value, ClientError> {
        let mut request = self.http.get(self.resource_url(doctype, Some(name)));
        if let Some(fields) = fields {
            request = request.query(&[("fields", serde_json::to_string(fields)?)]);
        }
        let envelope: ApiResponse = self.send(request).await?;
        Ok(envelope.data_or_null())
    }

    /// Create a new document from a field-value mapping.
    ///
    /// The mapping is re-encoded as a JSON string and wrapped in a `data`
    /// envelope; this is the server's serialization convention, not plain
    /// REST. Returns the stored record, which may include server-computed
    /// defaults.
    pub async fn create_doc(&self, doctype: &str, data: &Value) -> Result<Value, ClientError> {
        let body = json!({ "data": serde_json::to_string(data)? });
        let request = self
            .http
            .post(self.resource_url(doctype, None))
            .json_logged(&body);
        let envelope: ApiResponse = self.send(request).await?;
        Ok(envelope.data_or_null())
    }

    /// Update an existing document with a field-value mapping.
    pub async fn update_doc(
        &self,
        doctype: &str,
        name: &str,
        data: &Value,
    ) -> Result<Value, ClientError> {
        let body = json!({ "data": serde_json::to_string(data)? });
        let request = self
            .http
            .put(self.resource_url(doctype, Some(name)))
            .json_logged(&body);
        let envelope: ApiResponse = self.send(request).await?;
        Ok(envelope.data_or_null())
    }

    /// Delete a document. Returns the raw server envelope, which may be a
    /// plain acknowledgement.
    pub async fn delete_doc(&self, doctype: &str, name: &str) -> Result<Value, ClientError> {
        let request = self.http.delete(self.resource_url(doctype, Some(name)));
        self.send(request).await
    }

    // --- Methods ---

    /// Invoke a whitelisted server-side method by dotted name.
    ///
    /// GET sends `args` as query parameters (non-string values are
    /// JSON-encoded); POST sends them as a JSON body. The method name is
    /// caller-controlled and carries the same trust level as direct API
    /// access to the server.
    pub async fn call_method(
        &self,
        method: &str,
        http_method: Method,
        args: &Map<String, Value>,
    ) -> Result<Value, ClientError> {
        let url = self.method_url(method);
        let request = if http_method == Method::POST {
            self.http.post(url).json_logged(args)
        } else {
            let params: Vec<(String, String)> = args
                .iter()
                .map(|(key, value)| (key.clone(), encode_query_value(value)))
                .collect();
            self.http.get(url).query(&params)
        };
        self.send(request).await
    }

    // --- Document workflow ---

    /// Submit a draft document through the server-side workflow.
    ///
    /// Re-fetches the full document, marks it submitted and hands it to the
    /// submit RPC serialized as a JSON-string argument. The document is not
    /// re-validated locally; a rejected submission surfaces as the transport
    /// error from the RPC call.
    pub async fn submit_doc(&self, doctype: &str, name: &str) -> Result<Value, ClientError> {
        let mut doc = self.get_doc(doctype, name, None).await?;
        if let Some(fields) = doc.as_object_mut() {
            fields.insert("docstatus".to_string(), json!(1));
        }
        let mut args = Map::new();
        args.insert("doc".to_string(), Value::String(serde_json::to_string(&doc)?));
        self.call_method(METHOD_SUBMIT, Method::POST, &args).await
    }

    /// Cancel a submitted document. No local state change.
    pub async fn cancel_doc(&self, doctype: &str, name: &str) -> Result<Value, ClientError> {
        let mut args = Map::new();
        args.insert("doctype".to_string(), Value::String(doctype.to_string()));
        args.insert("name".to_string(), Value::String(name.to_string()));
        self.call_method(METHOD_CANCEL, Method::POST, &args).await
    }

    /// Count documents of a doctype, optionally filtered. Defaults to zero
    /// when the message payload is absent.
    pub async fn get_count(
        &self,
        doctype: &str,
        filters: Option<&Value>,
    ) -> Result<u64, ClientError> {
        let mut args = Map::new();
        args.insert("doctype".to_string(), Value::String(doctype.to_string()));
        if let Some(filters) = filters {
            args.insert(
                "filters".to_string(),
                Value::String(serde_json::to_string(filters)?),
            );
        }
        let result = self.call_method(METHOD_GET_COUNT, Method::GET, &args).await?;
        Ok(result.get("message").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Execute a server-side report. The result shape is report-specific
    /// and opaque to the adapter.
    pub async fn run_report(
        &self,
        report_name: &str,
        filters: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let mut args = Map::new();
        args.insert(
            "report_name".to_string(),
            Value::String(report_name.to_string()),
        );
        if let Some(filters) = filters {
            args.insert(
                "filters".to_string(),
                Value::String(serde_json::to_string(filters)?),
            );
        }
        self.call_method(METHOD_RUN_REPORT, Method::GET, &args).await
    }

    /// Search link field values (autocomplete). Reads the `message`
    /// payload, falling back to `results` when the RPC variant differs.
    pub async fn search_link(
        &self,
        doctype: &str,
        txt: &str,
        filters: Option<&Value>,
        page_length: u64,
    ) -> Result<Vec<Value>, ClientError> {
        let mut args = Map::new();
        args.insert("doctype".to_string(), Value::String(doctype.to_string()));
        args.insert("txt".to_string(), Value::String(txt.to_string()));
        args.insert("page_length".to_string(), json!(page_length));
        if let Some(filters) = filters {
            args.insert(
                "filters".to_string(),
                Value::String(serde_json::to_string(filters)?),
            );
        }
        let result = self
            .call_method(METHOD_SEARCH_LINK, Method::GET, &args)
            .await?;
        let hits = result
            .get("message")
            .or_else(|| result.get("results"))
            .cloned();
        match hits {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    /// Field definitions for a doctype, queried from DocField.
    pub async fn get_doctype_meta(&self, doctype: &str) -> Result<Vec<Value>, ClientError> {
        let mut args = Map::new();
        args.insert("doctype".to_string(), Value::String("DocField".to_string()));
        args.insert(
            "filters".to_string(),
            Value::String(serde_json::to_string(&json!({ "parent": doctype }))?),
        );
        args.insert(
            "fields".to_string(),
            Value::String(serde_json::to_string(&[
                "fieldname", "fieldtype", "label", "reqd", "options",
            ])?),
        );
        args.insert(
            "limit_page_length".to_string(),
            Value::String("0".to_string()),
        );
        let result = self.call_method(METHOD_GET_LIST, Method::GET, &args).await?;
        match result.get("message").cloned() {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    // --- Inventory & trading helpers ---

    /// Real-time stock balance from Bin, optionally narrowed by item and
    /// warehouse.
    pub async fn get_stock_balance(
        &self,
        item_code: Option<&str>,
        warehouse: Option<&str>,
    ) -> Result<Vec<Value>, ClientError> {
        let mut filters = Map::new();
        if let Some(item_code) = item_code {
            filters.insert("item_code".to_string(), Value::String(item_code.to_string()));
        }
        if let Some(warehouse) = warehouse {
            filters.insert("warehouse".to_string(), Value::String(warehouse.to_string()));
        }
        let query = ListQuery::new()
            .with_fields([
                "item_code",
                "warehouse",
                "actual_qty",
                "reserved_qty",
                "ordered_qty",
                "projected_qty",
            ])
            .with_filters(Value::Object(filters))
            .with_page_length(0);
        self.get_list("Bin", query).await
    }

    /// Item prices from Item Price records, optionally narrowed by price
    /// list.
    pub async fn get_item_price(
        &self,
        item_code: &str,
        price_list: Option<&str>,
    ) -> Result<Vec<Value>, ClientError> {
        let mut filters = Map::new();
        filters.insert("item_code".to_string(), Value::String(item_code.to_string()));
        if let Some(price_list) = price_list {
            filters.insert(
                "price_list".to_string(),
                Value::String(price_list.to_string()),
            );
        }
        let query = ListQuery::new()
            .with_fields([
                "item_code",
                "price_list",
                "price_list_rate",
                "currency",
                "uom",
            ])
            .with_filters(Value::Object(filters))
            .with_page_length(0);
        self.get_list("Item Price", query).await
    }

    /// Stock ledger entries (inventory transaction history), most recent
    /// first.
    pub async fn get_stock_ledger(
        &self,
        item_code: Option<&str>,
        warehouse: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Value>, ClientError> {
        let mut filters = Map::new();
        if let Some(item_code) = item_code {
            filters.insert("item_code".to_string(), Value::String(item_code.to_string()));
        }
        if let Some(warehouse) = warehouse {
            filters.insert("warehouse".to_string(), Value::String(warehouse.to_string()));
        }
        let query = ListQuery::new()
            .with_fields([
                "item_code",
                "warehouse",
                "posting_date",
                "qty_after_transaction",
                "actual_qty",
                "voucher_type",
                "voucher_no",
            ])
            .with_filters(Value::Object(filters))
            .with_order_by("posting_date desc, posting_time desc")
            .with_page_length(limit);
        self.get_list("Stock Ledger Entry", query).await
    }

    /// Create a new document mapped from an existing one, via a
    /// caller-supplied mapping method (e.g. order into invoice). The method
    /// name is not validated client-side; the server is the authority.
    pub async fn make_mapped_doc(
        &self,
        method: &str,
        source_name: &str,
    ) -> Result<Value, ClientError> {
        let mut args = Map::new();
        args.insert(
            "source_name".to_string(),
            Value::String(source_name.to_string()),
        );
        let result = self.call_method(method, Method::POST, &args).await?;
        Ok(match result.get("message") {
            Some(message) => message.clone(),
            None => result,
        })
    }

    /// Outstanding balance for a Customer or Supplier. Defaults to zero
    /// when the message payload is absent.
    pub async fn get_party_balance(
        &self,
        party_type: &str,
        party: &str,
    ) -> Result<Value, ClientError> {
        let mut args = Map::new();
        args.insert(
            "party_type".to_string(),
            Value::String(party_type.to_string()),
        );
        args.insert("party".to_string(), Value::String(party.to_string()));
        let result = self
            .call_method(METHOD_PARTY_BALANCE, Method::GET, &args)
            .await?;
        Ok(result.get("message").cloned().unwrap_or(json!(0)))
    }

    // --- File operations ---

    /// Upload raw bytes as a new File document.
    ///
    /// Runs on a short-lived client so the multipart encoder controls the
    /// content headers; the expect-continue handshake is never emitted.
    pub async fn upload_file(
        &self,
        content: Vec<u8>,
        filename: &str,
        attached_to_doctype: Option<&str>,
        attached_to_name: Option<&str>,
        is_private: bool,
    ) -> Result<FileRecord, ClientError> {
        let part = reqwest::multipart::Part::bytes(content).file_name(filename.to_string());
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("is_private", if is_private { "1" } else { "0" });
        if let Some(doctype) = attached_to_doctype {
            form = form.text("doctype", doctype.to_string());
        }
        if let Some(name) = attached_to_name {
            form = form.text("docname", name.to_string());
        }

        let client = build_file_client(&self.config, &self.options)?;
        let request = client.post(self.method_url(METHOD_UPLOAD_FILE)).multipart(form);
        self.file_from_upload(request).await
    }

    /// Upload a file by remote URL; the server fetches the content itself.
    /// Form-encoded variant of [`Self::upload_file`], on the same
    /// short-lived client.
    pub async fn upload_file_from_url(
        &self,
        file_url: &str,
        filename: Option<&str>,
        attached_to_doctype: Option<&str>,
        attached_to_name: Option<&str>,
        is_private: bool,
    ) -> Result<FileRecord, ClientError> {
        let mut fields: Vec<(&str, String)> = vec![
            ("file_url", file_url.to_string()),
            ("is_private", if is_private { "1" } else { "0" }.to_string()),
        ];
        if let Some(filename) = filename {
            fields.push(("file_name", filename.to_string()));
        }
        if let Some(doctype) = attached_to_doctype {
            fields.push(("doctype", doctype.to_string()));
        }
        if let Some(name) = attached_to_name {
            fields.push(("docname", name.to_string()));
        }

        let client = build_file_client(&self.config, &self.options)?;
        let request = client.post(self.method_url(METHOD_UPLOAD_FILE)).form(&fields);
        self.file_from_upload(request).await
    }

    async fn file_from_upload(&self, request: RequestBuilder) -> Result<FileRecord, ClientError> {
        let result: Value = self.send(request).await?;
        let record = result
            .get("message")
            .cloned()
            .ok_or_else(|| ClientError::Response("upload returned no file record".to_string()))?;
        serde_json::from_value(record).map_err(ClientError::from)
    }

    /// List stored files, optionally narrowed to an attachment target or
    /// privacy class.
    pub async fn list_files(
        &self,
        attached_to_doctype: Option<&str>,
        attached_to_name: Option<&str>,
        is_private: Option<bool>,
        limit: u64,
    ) -> Result<Vec<FileRecord>, ClientError> {
        let mut filters = Map::new();
        if let Some(doctype) = attached_to_doctype {
            filters.insert(
                "attached_to_doctype".to_string(),
                Value::String(doctype.to_string()),
            );
        }
        if let Some(name) = attached_to_name {
            filters.insert(
                "attached_to_name".to_string(),
                Value::String(name.to_string()),
            );
        }
        if let Some(is_private) = is_private {
            filters.insert(
                "is_private".to_string(),
                json!(if is_private { 1 } else { 0 }),
            );
        }

        let mut query = ListQuery::new()
            .with_fields([
                "name",
                "file_name",
                "file_url",
                "file_size",
                "attached_to_doctype",
                "attached_to_name",
                "is_private",
            ])
            .with_page_length(limit);
        if !filters.is_empty() {
            query = query.with_filters(Value::Object(filters));
        }

        let rows = self.get_list("File", query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(ClientError::from))
            .collect()
    }

    /// Full download URL for a stored file, prefixing the server base
    /// address when the stored URL is relative.
    pub async fn get_file_url(&self, file_name: &str) -> Result<String, ClientError> {
        let record = self.get_file(file_name).await?;
        let url = self.stored_url(file_name, &record)?;
        Ok(url)
    }

    /// Download a file's content. Returns the raw bytes and the original
    /// filename.
    pub async fn download_file(&self, file_name: &str) -> Result<(Bytes, String), ClientError> {
        let record = self.get_file(file_name).await?;
        let url = self.stored_url(file_name, &record)?;
        let filename = record.file_name.unwrap_or_else(|| file_name.to_string());

        let client = build_file_client(&self.config, &self.options)?;
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        Ok((response.bytes().await?, filename))
    }

    async fn get_file(&self, file_name: &str) -> Result<FileRecord, ClientError> {
        let doc = self.get_doc("File", file_name, None).await?;
        serde_json::from_value(doc).map_err(ClientError::from)
    }

    fn stored_url(&self, file_name: &str, record: &FileRecord) -> Result<String, ClientError> {
        let url = record
            .file_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ClientError::Response(format!("file {file_name} has no stored URL"))
            })?;
        Ok(resolve_file_url(&self.config.url, url))
    }
}
