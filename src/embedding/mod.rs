//! Client abstraction for deriving text and image embeddings

pub mod models;

pub use models::{Embeddings, EmbeddingsRequest};

use crate::context::CallContext;
use crate::error::Result;
use async_trait::async_trait;

/// Trait implemented by every embeddings transport
///
/// Implementations do no request validation of their own; whatever the
/// backend rejects is surfaced as an error tagged with the failing operation.
#[async_trait]
pub trait EmbeddingsClient: Send + Sync {
    /// Derive embeddings for `req.body` interpreted as text
    async fn compute_text_embeddings(
        &self,
        ctx: &CallContext,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings>;

    /// Derive embeddings for `req.body` interpreted as raw image bytes
    async fn compute_image_embeddings(
        &self,
        ctx: &CallContext,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings>;
}
