//! Protobuf messages and RPC stub for the embeddings service

use crate::embedding::{Embeddings, EmbeddingsRequest as ClientRequest};
use async_trait::async_trait;
use bytes::Bytes;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::Status;

/// Fully qualified gRPC service name
pub const SERVICE_NAME: &str = "mobileclip.EmbeddingsService";

const TEXT_METHOD: &str = "/mobileclip.EmbeddingsService/ComputeTextEmbeddings";
const IMAGE_METHOD: &str = "/mobileclip.EmbeddingsService/ComputeImageEmbeddings";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EmbeddingsRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub model: String,
    #[prost(bytes = "bytes", tag = "3")]
    pub body: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EmbeddingsResponse {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub model: String,
    #[prost(int32, tag = "3")]
    pub dimensions: i32,
    #[prost(float, repeated, tag = "4")]
    pub embeddings: Vec<f32>,
    #[prost(int64, tag = "5")]
    pub created: i64,
}

impl From<&ClientRequest> for EmbeddingsRequest {
    fn from(req: &ClientRequest) -> Self {
        Self {
            id: req.id.clone().unwrap_or_default(),
            model: req.model.clone(),
            body: req.body.clone(),
        }
    }
}

impl From<EmbeddingsResponse> for Embeddings {
    fn from(rsp: EmbeddingsResponse) -> Self {
        Self {
            id: Some(rsp.id).filter(|id| !id.is_empty()),
            embeddings: rsp.embeddings,
            dimensions: rsp.dimensions,
            model: rsp.model,
            created: rsp.created,
        }
    }
}

/// Remote methods of the embeddings service
#[async_trait]
pub trait EmbeddingsRpc: Send + Sync {
    async fn compute_text_embeddings(
        &self,
        req: EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, Status>;

    async fn compute_image_embeddings(
        &self,
        req: EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, Status>;
}

/// Tonic-backed stub over a (possibly not yet connected) channel
#[derive(Clone)]
pub struct TonicEmbeddingsRpc {
    inner: tonic::client::Grpc<Channel>,
}

impl TonicEmbeddingsRpc {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    async fn unary(
        &self,
        method: &'static str,
        req: EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, Status> {
        let mut inner = self.inner.clone();

        inner
            .ready()
            .await
            .map_err(|e| Status::unavailable(format!("Service was not ready: {}", e)))?;

        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(method);

        inner
            .unary(tonic::Request::new(req), path, codec)
            .await
            .map(tonic::Response::into_inner)
    }
}

#[async_trait]
impl EmbeddingsRpc for TonicEmbeddingsRpc {
    async fn compute_text_embeddings(
        &self,
        req: EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, Status> {
        self.unary(TEXT_METHOD, req).await
    }

    async fn compute_image_embeddings(
        &self,
        req: EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, Status> {
        self.unary(IMAGE_METHOD, req).await
    }
}
