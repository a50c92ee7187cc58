//! gRPC transport for a remote embeddings service
//!
//! URIs take the form
//! `grpc://host[:port]?tls-certificate=..&tls-key=..&tls-ca-certificate=..&tls-insecure=..`.
//! TLS is only configured when both `tls-certificate` and `tls-key` are
//! present; otherwise the channel is plaintext HTTP/2. The channel connects
//! lazily, so an unreachable backend is reported on the first call.

pub mod tls;
pub mod wire;

pub use tls::{GrpcOptions, TlsOptions};
pub use wire::{EmbeddingsRpc, TonicEmbeddingsRpc};

use crate::context::CallContext;
use crate::embedding::{Embeddings, EmbeddingsClient, EmbeddingsRequest};
use crate::error::{EmbeddingsError, Operation, Result};
use async_trait::async_trait;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tonic::codegen::http::Uri;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::{debug, info, warn};
use url::Url;

pub const SCHEME: &str = "grpc";

/// Embeddings client speaking to the remote service over gRPC
pub struct GrpcEmbeddingsClient {
    rpc: Arc<dyn EmbeddingsRpc>,
    target: String,
}

impl GrpcEmbeddingsClient {
    /// Create a client for `uri`
    ///
    /// Must be called from within a Tokio runtime; the channel's background
    /// worker is spawned here even though no connection is made yet.
    pub fn new(uri: &Url) -> Result<Self> {
        let opts = GrpcOptions::from_uri(uri)?;
        let target = opts.authority();

        let endpoint = Endpoint::from_shared(format!("http://{}", target))
            .map_err(|e| EmbeddingsError::invalid_uri(uri.as_str(), e))?;

        let channel = match &opts.tls {
            Some(tls_opts) => {
                let config = tls::client_config(tls_opts)?;
                info!(
                    "Initialized gRPC embeddings client for {} with TLS (insecure={})",
                    target, tls_opts.insecure
                );
                tls_channel(&endpoint, Arc::new(config))
            }
            None => {
                info!("Initialized gRPC embeddings client for {} without TLS", target);
                endpoint.connect_lazy()
            }
        };

        Ok(Self {
            rpc: Arc::new(TonicEmbeddingsRpc::new(channel)),
            target,
        })
    }

    /// Create a client over an existing RPC stub
    pub fn with_rpc(rpc: impl EmbeddingsRpc + 'static) -> Self {
        Self {
            rpc: Arc::new(rpc),
            target: "custom".to_string(),
        }
    }

    /// Registry initializer for the `grpc` scheme
    pub async fn from_uri(_ctx: CallContext, uri: Url) -> Result<Box<dyn EmbeddingsClient>> {
        Ok(Box::new(Self::new(&uri)?))
    }

    /// Address this client sends requests to
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn call(
        &self,
        ctx: &CallContext,
        operation: Operation,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        let wire_req = wire::EmbeddingsRequest::from(req);

        debug!(
            "Requesting {} from {} (model={}, bytes={})",
            operation,
            self.target,
            req.model,
            req.body.len()
        );

        let rsp = ctx
            .run(operation, async {
                let result = match operation {
                    Operation::Text => self.rpc.compute_text_embeddings(wire_req).await,
                    Operation::Image => self.rpc.compute_image_embeddings(wire_req).await,
                };
                result.map_err(|status| status_error(operation, status))
            })
            .await?;

        Ok(rsp.into())
    }
}

#[async_trait]
impl EmbeddingsClient for GrpcEmbeddingsClient {
    async fn compute_text_embeddings(
        &self,
        ctx: &CallContext,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        self.call(ctx, Operation::Text, req).await
    }

    async fn compute_image_embeddings(
        &self,
        ctx: &CallContext,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        self.call(ctx, Operation::Image, req).await
    }
}

fn status_error(operation: Operation, status: Status) -> EmbeddingsError {
    warn!("gRPC {} call failed: {}", operation, status);

    match status.code() {
        Code::Unavailable => EmbeddingsError::transport(operation, status),
        Code::Cancelled | Code::DeadlineExceeded => EmbeddingsError::Cancelled(operation),
        code => EmbeddingsError::RemoteCall {
            operation,
            message: format!("{:?}: {}", code, status.message()),
        },
    }
}

/// Lazily connected channel that wraps each TCP connection in rustls
fn tls_channel(endpoint: &Endpoint, config: Arc<rustls::ClientConfig>) -> Channel {
    let connector = TlsConnector::from(config);

    endpoint.connect_with_connector_lazy(tower::service_fn(move |uri: Uri| {
        let connector = connector.clone();

        async move {
            let host = uri
                .host()
                .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "missing host"))?;
            let port = uri.port_u16().unwrap_or(443);

            let tcp = TcpStream::connect((host.as_str(), port)).await?;
            let server_name = ServerName::try_from(host)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let stream = connector.connect(server_name, tcp).await?;

            Ok::<_, io::Error>(TokioIo::new(stream))
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_status_mapping() {
        let err = status_error(Operation::Text, Status::unavailable("connection refused"));
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = status_error(Operation::Text, Status::deadline_exceeded("slow"));
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        let err = status_error(Operation::Image, Status::invalid_argument("unknown model"));
        assert_eq!(err.kind(), ErrorKind::RemoteCall);
        assert!(err.to_string().contains("unknown model"));
        assert!(err.to_string().contains("image embeddings"));
    }

    #[tokio::test]
    async fn test_construction_is_lazy() {
        // Nothing listens here; construction must still succeed.
        let uri = Url::parse("grpc://127.0.0.1:1?tls-insecure=true").unwrap();
        let client = GrpcEmbeddingsClient::new(&uri).unwrap();
        assert_eq!(client.target(), "127.0.0.1:1");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let uri = Url::parse("grpc://127.0.0.1:1").unwrap();
        let client = GrpcEmbeddingsClient::new(&uri).unwrap();

        let ctx = CallContext::new().with_timeout(std::time::Duration::from_secs(10));
        let err = client
            .compute_text_embeddings(&ctx, &EmbeddingsRequest::text("s0", "hello"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
