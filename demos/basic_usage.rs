//! Basic usage example for the embeddings client
//!
//! Registers an extra transport next to the built-in ones, then resolves
//! clients purely from connection URIs.

use async_trait::async_trait;
use embeddings_client::prelude::*;

/// Toy transport deriving a byte histogram instead of calling a model
struct HistogramClient {
    buckets: usize,
}

impl HistogramClient {
    fn embed(&self, req: &EmbeddingsRequest) -> Embeddings {
        let mut vector = vec![0f32; self.buckets];
        for byte in req.body.iter() {
            vector[*byte as usize % self.buckets] += 1.0;
        }

        Embeddings {
            id: req.id.clone(),
            dimensions: vector.len() as i32,
            embeddings: vector,
            model: format!("histogram-{}", req.model),
            created: 0,
        }
    }
}

#[async_trait]
impl EmbeddingsClient for HistogramClient {
    async fn compute_text_embeddings(
        &self,
        _ctx: &CallContext,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        Ok(self.embed(req))
    }

    async fn compute_image_embeddings(
        &self,
        _ctx: &CallContext,
        req: &EmbeddingsRequest,
    ) -> Result<Embeddings> {
        Ok(self.embed(req))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    embeddings_client::observability::init_tracing(&Default::default());

    println!("=== Embeddings Client Basic Usage Example ===\n");

    // histogram://local?buckets=8
    register_client(
        "histogram",
        initializer(|_ctx, uri| async move {
            let buckets = uri
                .query_pairs()
                .find(|(k, _)| k == "buckets")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(16usize)
                .max(1);
            Ok(Box::new(HistogramClient { buckets }) as Box<dyn EmbeddingsClient>)
        }),
    )?;

    println!("1. Registered schemes: {:?}\n", embeddings_client::schemes());

    let ctx = CallContext::new();

    for uri in ["null://", "histogram://local?buckets=8"] {
        let client = new_client(&ctx, uri).await?;
        let req = EmbeddingsRequest::text("s0", "a photograph of a cat");
        let embeddings = client.compute_text_embeddings(&ctx, &req).await?;

        println!("2. {} -> {} dimensions", uri, embeddings.dimensions);
        println!("   {}", serde_json::to_string(&embeddings).unwrap_or_default());
    }

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
