//! REST client for the hosted hierarchical store.
//!
//! Every path maps to `{base_url}/{path}.json`. Reads that find nothing
//! return JSON `null`. Server timestamps are sent as the `{".sv":
//! "timestamp"}` placeholder and resolved by the store on commit.
//!
//! # Transactions
//!
//! ```text
//! GET  path.json   (X-Firebase-ETag: true)  -> value + ETag
//! PUT  path.json   (if-match: ETag)         -> 200 committed
//!                                           -> 412 changed underneath: retry
//! ```
//!
//! Conflicts are retried up to `max_transaction_attempts` times before the
//! transaction gives up with [`Error::WriteFailed`].

use super::traits::RemoteStore;
use crate::config::StoreConfig;
use crate::{Error, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::time::Duration;

const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";
const ETAG_RESPONSE_HEADER: &str = "ETag";
const IF_MATCH_HEADER: &str = "if-match";

/// [`RemoteStore`] implementation over the store's REST protocol.
#[derive(Debug)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<SecretString>,
    max_transaction_attempts: u32,
}

impl RestStore {
    /// Creates a REST store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is configured or the HTTP client
    /// cannot be built.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let base_url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                Error::InvalidInput(
                    "store url is not configured (set store.url or FOLIO_STORE_URL)".to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .user_agent(format!("folio/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::OperationFailed {
                operation: "build_http_client".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            max_transaction_attempts: config.max_transaction_attempts.max(1),
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.client.request(method, resource_url(&self.base_url, path));
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token.expose_secret())]);
        }
        request
    }

    async fn send_write(&self, operation: &str, request: RequestBuilder) -> Result<()> {
        let response = request.send().await.map_err(|e| write_failed(operation, &e))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::WriteFailed {
                operation: operation.to_string(),
                cause: format!("HTTP {status}"),
            })
        }
    }

    /// Reads the value at `path` together with its ETag.
    async fn get_with_etag(&self, path: &str) -> Result<(Option<Value>, String)> {
        let response = self
            .request(Method::GET, path)
            .header(ETAG_REQUEST_HEADER, "true")
            .send()
            .await
            .map_err(|e| unavailable("rest_transaction_read", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::StoreUnavailable {
                operation: "rest_transaction_read".to_string(),
                cause: format!("HTTP {status}"),
            });
        }

        let etag = response
            .headers()
            .get(ETAG_RESPONSE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::StoreUnavailable {
                operation: "rest_transaction_read".to_string(),
                cause: "response carried no ETag".to_string(),
            })?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| unavailable("rest_transaction_read", &e))?;

        Ok((present(value), etag))
    }
}

impl RemoteStore for RestStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        tracing::debug!(path, "rest store get");
        metrics::counter!("folio_store_operations_total", "backend" => "rest", "op" => "get")
            .increment(1);

        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(|e| unavailable("rest_get", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::StoreUnavailable {
                operation: "rest_get".to_string(),
                cause: format!("HTTP {status}"),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| unavailable("rest_get", &e))?;
        Ok(present(value))
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        tracing::debug!(path, "rest store set");
        metrics::counter!("folio_store_operations_total", "backend" => "rest", "op" => "set")
            .increment(1);
        let request = self.request(Method::PUT, path).json(&value);
        self.send_write("rest_set", request).await
    }

    async fn update(&self, path: &str, patch: Map<String, Value>) -> Result<()> {
        tracing::debug!(path, fields = patch.len(), "rest store update");
        metrics::counter!("folio_store_operations_total", "backend" => "rest", "op" => "update")
            .increment(1);
        let request = self.request(Method::PATCH, path).json(&patch);
        self.send_write("rest_update", request).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        tracing::debug!(path, "rest store remove");
        metrics::counter!("folio_store_operations_total", "backend" => "rest", "op" => "remove")
            .increment(1);
        let request = self.request(Method::DELETE, path);
        self.send_write("rest_remove", request).await
    }

    fn generate_key(&self) -> String {
        uuid::Uuid::now_v7().simple().to_string()
    }

    async fn transaction<F>(&self, path: &str, update: F) -> Result<Value>
    where
        F: Fn(Option<&Value>) -> Value + Send + Sync,
    {
        metrics::counter!(
            "folio_store_operations_total",
            "backend" => "rest",
            "op" => "transaction"
        )
        .increment(1);

        for attempt in 1..=self.max_transaction_attempts {
            let (current, etag) = self.get_with_etag(path).await?;
            let next = update(current.as_ref());

            let response = self
                .request(Method::PUT, path)
                .header(IF_MATCH_HEADER, etag)
                .json(&next)
                .send()
                .await
                .map_err(|e| write_failed("rest_transaction_write", &e))?;

            let status = response.status();
            if status.is_success() {
                tracing::debug!(path, attempt, "rest transaction committed");
                return Ok(next);
            }
            if status == StatusCode::PRECONDITION_FAILED {
                tracing::debug!(path, attempt, "rest transaction conflict, retrying");
                metrics::counter!("folio_store_transaction_conflicts_total").increment(1);
                continue;
            }
            return Err(Error::WriteFailed {
                operation: "rest_transaction_write".to_string(),
                cause: format!("HTTP {status}"),
            });
        }

        Err(Error::WriteFailed {
            operation: "rest_transaction".to_string(),
            cause: format!(
                "gave up after {} conflicting attempts",
                self.max_transaction_attempts
            ),
        })
    }
}

/// Builds the REST resource URL for a store path.
fn resource_url(base_url: &str, path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        format!("{}/.json", base_url.trim_end_matches('/'))
    } else {
        format!("{}/{path}.json", base_url.trim_end_matches('/'))
    }
}

fn present(value: Value) -> Option<Value> {
    if value.is_null() { None } else { Some(value) }
}

fn unavailable(operation: &str, e: &reqwest::Error) -> Error {
    Error::StoreUnavailable {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

fn write_failed(operation: &str, e: &reqwest::Error) -> Error {
    Error::WriteFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}
