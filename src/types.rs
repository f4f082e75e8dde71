//! Wire types shared between the adapter and the tool layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

/// Response envelope returned by every ERPNext endpoint.
///
/// CRUD endpoints populate `data`, whitelisted method calls populate
/// `message`, and server-side failures may carry `exc` / `exc_type`.
/// Which key is present depends on the endpoint, so the accessors default
/// to an empty value instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    pub data: Option<Value>,
    pub message: Option<Value>,
    pub exc: Option<String>,
    pub exc_type: Option<String>,
}

impl ApiResponse {
    /// The `data` payload, or `Value::Null` when absent.
    pub fn data_or_null(self) -> Value {
        self.data.unwrap_or(Value::Null)
    }

    /// The `data` payload as a list of records; empty when absent or not a
    /// list.
    pub fn data_rows(self) -> Vec<Value> {
        match self.data {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        }
    }

    /// The `message` payload, or `Value::Null` when absent.
    pub fn message_or_null(self) -> Value {
        self.message.unwrap_or(Value::Null)
    }
}

/// Query options for list operations.
///
/// `fields`, `filters` and `or_filters` are transmitted to the server as
/// JSON-encoded strings inside query parameters; the adapter treats the
/// filter expressions as opaque.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub fields: Option<Vec<String>>,
    pub filters: Option<Value>,
    pub or_filters: Option<Value>,
    pub order_by: Option<String>,
    pub limit_start: u64,
    /// Page size; the server treats 0 as "no limit".
    pub limit_page_length: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            fields: None,
            filters: None,
            or_filters: None,
            order_by: None,
            limit_start: 0,
            limit_page_length: 20,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field projection.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the filter expression (field→value object or operator triples).
    pub fn with_filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Set the OR-combined filter expression.
    pub fn with_or_filters(mut self, or_filters: Value) -> Self {
        self.or_filters = Some(or_filters);
        self
    }

    /// Set the sort expression, e.g. `"creation desc"`.
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Set the pagination offset.
    pub fn with_limit_start(mut self, start: u64) -> Self {
        self.limit_start = start;
        self
    }

    /// Set the page size (0 for no limit).
    pub fn with_page_length(mut self, length: u64) -> Self {
        self.limit_page_length = length;
        self
    }
}

/// A stored file on the remote server.
///
/// `file_url` may be relative to the server base address; resolve it with
/// [`resolve_file_url`] before fetching.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<u64>,
    pub attached_to_doctype: Option<String>,
    pub attached_to_name: Option<String>,
    /// Privacy flag as stored by the server (0 = public, 1 = private).
    pub is_private: Option<u8>,
}

/// Whether a value has the outer shape of a filter expression: an object
/// mapping field names to exact-match values, or an ordered list of
/// `[field, operator, value]` triples.
pub fn is_filter_shaped(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Encode an RPC argument for query-string transmission: strings pass
/// through verbatim, everything else is JSON-encoded.
pub fn encode_query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolve a stored file URL against the server base address.
///
/// Stored URLs are either absolute or rooted at the server (`/files/...`).
pub fn resolve_file_url(base_url: &str, file_url: &str) -> String {
    if file_url.starts_with("http://") || file_url.starts_with("https://") {
        file_url.to_string()
    } else if file_url.starts_with('/') {
        format!("{}{}", base_url, file_url)
    } else {
        format!("{}/{}", base_url, file_url)
    }
}
