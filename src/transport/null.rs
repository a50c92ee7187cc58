//! No-op transport for tests and local development

use crate::context::CallContext;
use crate::embedding::{Embeddings, EmbeddingsClient, EmbeddingsRequest};
use crate::error::Result;
use async_trait::async_trait;
use url::Url;

pub const SCHEME: &str = "null";

/// Client that returns zero-valued embeddings for every request and never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmbeddingsClient;

impl NullEmbeddingsClient {
    pub async fn from_uri(_ctx: CallContext, _uri: Url) -> Result<Box<dyn EmbeddingsClient>> {
        Ok(Box::new(NullEmbeddingsClient))
    }
}

#[async_trait]
impl EmbeddingsClient for NullEmbeddingsClient {
    async fn compute_text_embeddings(
        &self,
        _ctx: &CallContext,
        _req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        Ok(Embeddings::default())
    }

    async fn compute_image_embeddings(
        &self,
        _ctx: &CallContext,
        _req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        Ok(Embeddings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_zero_value_even_when_cancelled() {
        let client = NullEmbeddingsClient;
        let ctx = CallContext::new();
        ctx.cancel();

        let req = EmbeddingsRequest::image("a.png", "s0", Vec::<u8>::new());
        let emb = client.compute_image_embeddings(&ctx, &req).await.unwrap();

        assert_eq!(emb, Embeddings::default());
        assert!(emb.id.is_none());
    }
}
