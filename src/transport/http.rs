//! JSON-over-HTTP transport
//!
//! `http[s]://host[:port][/base]?timeout=<secs>&tls-insecure=<bool>`
//!
//! Bodies are posted raw to `{base}/embeddings/text` or
//! `{base}/embeddings/image` with `model` and `id` as query parameters; the
//! service answers with a JSON encoded [`Embeddings`].

use crate::context::CallContext;
use crate::embedding::{Embeddings, EmbeddingsClient, EmbeddingsRequest};
use crate::error::{EmbeddingsError, Operation, Result};
use crate::transport::{parse_bool, query_param};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub const SCHEME_HTTP: &str = "http";
pub const SCHEME_HTTPS: &str = "https";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Embeddings client for services exposing a plain HTTP endpoint
pub struct HttpEmbeddingsClient {
    http_client: Client,
    base_url: Url,
}

impl HttpEmbeddingsClient {
    /// Create a client for `uri`
    pub fn new(uri: &Url) -> Result<Self> {
        if uri.host_str().map_or(true, str::is_empty) {
            return Err(EmbeddingsError::invalid_uri(uri.as_str(), "missing host"));
        }

        let timeout = request_timeout(uri)?;

        let insecure = match query_param(uri, "tls-insecure") {
            Some(value) => parse_bool("tls-insecure", &value)?,
            None => false,
        };

        if insecure {
            warn!("TLS certificate verification disabled for {}", uri.host_str().unwrap_or_default());
        }

        let mut builder = Client::builder()
            .pool_max_idle_per_host(10)
            .danger_accept_invalid_certs(insecure);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| EmbeddingsError::TlsConfiguration(e.to_string()))?;

        let mut base_url = uri.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        info!("Initialized HTTP embeddings client for {} (timeout={:?})", base_url, timeout);

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Create client with custom HTTP client
    pub fn with_http_client(base_url: Url, http_client: Client) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// Registry initializer for the `http` and `https` schemes
    pub async fn from_uri(_ctx: CallContext, uri: Url) -> Result<Box<dyn EmbeddingsClient>> {
        Ok(Box::new(Self::new(&uri)?))
    }

    fn endpoint(&self, operation: Operation) -> Url {
        let kind = match operation {
            Operation::Text => "text",
            Operation::Image => "image",
        };

        let mut url = self.base_url.clone();
        let path = format!("{}/embeddings/{}", url.path().trim_end_matches('/'), kind);
        url.set_path(&path);
        url
    }

    async fn try_request(&self, operation: Operation, req: &EmbeddingsRequest) -> Result<Embeddings> {
        let mut query = vec![("model", req.model.as_str())];
        if let Some(id) = &req.id {
            query.push(("id", id.as_str()));
        }

        let url = self.endpoint(operation);
        debug!("Posting {} bytes to {}", req.body.len(), url);

        let response = self
            .http_client
            .post(url)
            .query(&query)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(req.body.clone())
            .send()
            .await
            .map_err(|e| EmbeddingsError::transport(operation, e))?;

        let status = response.status();

        match status {
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| EmbeddingsError::transport(operation, e))?;

                let embeddings: Embeddings = serde_json::from_slice(&body).map_err(|e| {
                    EmbeddingsError::Decode {
                        operation,
                        source: e.into(),
                    }
                })?;

                debug!("Received {} dimensions", embeddings.dimensions);
                Ok(embeddings)
            }
            _ => {
                let error_text = response.text().await.unwrap_or_default();
                error!("Embeddings request failed with status {}: {}", status, error_text);
                Err(EmbeddingsError::RemoteCall {
                    operation,
                    message: format!("Status {}: {}", status, error_text),
                })
            }
        }
    }
}

/// Per-request timeout from `?timeout=<secs>`; 0 disables it
fn request_timeout(uri: &Url) -> Result<Option<Duration>> {
    let secs = match query_param(uri, "timeout") {
        Some(value) => value.parse::<u64>().map_err(|e| {
            EmbeddingsError::invalid_uri(uri.as_str(), format!("bad ?timeout= value: {}", e))
        })?,
        None => DEFAULT_TIMEOUT_SECS,
    };

    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

#[async_trait]
impl EmbeddingsClient for HttpEmbeddingsClient {
    async fn compute_text_embeddings(
        &self,
        ctx: &CallContext,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        ctx.run(Operation::Text, self.try_request(Operation::Text, req))
            .await
    }

    async fn compute_image_embeddings(
        &self,
        ctx: &CallContext,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        ctx.run(Operation::Image, self.try_request(Operation::Image, req))
            .await
    }
}
