//! HTTP client utilities for talking to the ERPNext REST surface.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};

use crate::client::ClientError;
use crate::config::{Config, ConnectOptions};

/// Authorization header value for an API key/secret pair.
pub fn auth_header(config: &Config) -> Result<HeaderValue, ClientError> {
    let mut value =
        HeaderValue::from_str(&format!("token {}:{}", config.api_key, config.api_secret))
            .map_err(|_| ClientError::Config("API credentials are not header-safe".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Build the pooled client used for the default operations.
///
/// Carries the token authorization and JSON content headers on every
/// request, with the configured per-request timeout.
pub fn build_http_client(config: &Config, options: &ConnectOptions) -> Result<Client, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth_header(config)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    insert_extra_headers(&mut headers, options)?;

    Client::builder()
        .default_headers(headers)
        .timeout(options.timeout)
        .build()
        .map_err(ClientError::from)
}

/// Build a short-lived client for file transfers.
///
/// File requests must not inherit the JSON `Content-Type` default: the
/// multipart and form encoders set their own content headers per request.
/// Uses the longer file-transfer timeout.
pub fn build_file_client(config: &Config, options: &ConnectOptions) -> Result<Client, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth_header(config)?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    insert_extra_headers(&mut headers, options)?;

    Client::builder()
        .default_headers(headers)
        .timeout(options.file_timeout)
        .build()
        .map_err(ClientError::from)
}

fn insert_extra_headers(
    headers: &mut HeaderMap,
    options: &ConnectOptions,
) -> Result<(), ClientError> {
    if let Some(extra) = &options.headers {
        for (key, value) in extra {
            let name: HeaderName = key
                .parse()
                .map_err(|_| ClientError::Config(format!("invalid header name: {key}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::Config(format!("invalid header value for {key}")))?;
            headers.insert(name, value);
        }
    }
    Ok(())
}

/// Extension trait for RequestBuilder that logs request body.
pub trait RequestBuilderExt {
    /// Set JSON request body and log it. Returns the RequestBuilder for chaining.
    fn json_logged<T: serde::Serialize + ?Sized>(self, json: &T) -> Self;
}

impl RequestBuilderExt for RequestBuilder {
    fn json_logged<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        if let Ok(req_body) = serde_json::to_string(json) {
            tracing::debug!("API request body ({} bytes):\n{}", req_body.len(), req_body);
        }

        self.json(json)
    }
}

/// Extension trait for Response that logs response body.
#[async_trait::async_trait]
pub trait ResponseExt {
    /// Get response text and log it. Consumes the response.
    async fn text_logged(self) -> Result<String, reqwest::Error>;

    /// Parse response as JSON and log it. Consumes the response.
    async fn json_logged<T: serde::de::DeserializeOwned>(self) -> Result<T, ClientError>;
}

#[async_trait::async_trait]
impl ResponseExt for reqwest::Response {
    async fn text_logged(self) -> Result<String, reqwest::Error> {
        let text = self.text().await?;
        tracing::debug!("API response ({} bytes):\n{}", text.len(), text);
        Ok(text)
    }

    async fn json_logged<T: serde::de::DeserializeOwned>(self) -> Result<T, ClientError> {
        let bytes = self.bytes().await?;

        if let Ok(text) = std::str::from_utf8(&bytes) {
            tracing::debug!("API response ({} bytes):\n{}", text.len(), text);
        }

        serde_json::from_slice(&bytes).map_err(ClientError::from)
    }
}
