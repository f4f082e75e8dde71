//! # erpnext-mcp - ERPNext over the Model Context Protocol
//!
//! A small, pragmatic protocol-translation gateway: it exposes the REST API
//! of an ERPNext server as a set of MCP tools, so an external agent can
//! list, read, create, update, submit, cancel and report on business
//! documents, and manage file attachments, without speaking the ERP's
//! native HTTP dialect.
//!
//! ## Architecture
//!
//! 1. **[`Config`]** reads the server address and API credentials from the
//!    process environment.
//! 2. **[`ErpNextClient`]** is the adapter: one typed method per remote
//!    capability, hiding the server's encoding conventions (JSON-encoded
//!    query parameters, `data`-envelope bodies, multipart uploads,
//!    whitelisted RPC calls).
//! 3. **[`ErpNextTools`]** registers one MCP tool per adapter method and
//!    serves them over stdio.
//!
//! All state lives on the remote server; the adapter only holds a pooled
//! HTTP session. Each operation is a single request/response unit with no
//! retries - failures surface as transport errors to the caller.
//!
//! ## Example
//! ```no_run
//! use erpnext_mcp::client::ErpNextClient;
//! use erpnext_mcp::config::Config;
//! use erpnext_mcp::types::ListQuery;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = ErpNextClient::new(config)?;
//!
//!     let open_orders = client
//!         .get_list(
//!             "Sales Order",
//!             ListQuery::new().with_filters(serde_json::json!({ "status": "To Deliver and Bill" })),
//!         )
//!         .await?;
//!     println!("{open_orders:?}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod http;
pub mod server;
pub mod types;

pub use client::{ClientError, ErpNextClient};
pub use config::{Config, ConnectOptions};
pub use server::ErpNextTools;
pub use types::{ApiResponse, FileRecord, ListQuery};

// Re-export rmcp for convenience
pub use rmcp;
