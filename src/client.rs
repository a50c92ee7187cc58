//! Factory resolving connection URIs to embeddings clients

use crate::context::CallContext;
use crate::embedding::EmbeddingsClient;
use crate::error::{EmbeddingsError, Result};
use crate::registry::ClientRegistry;
use tracing::{debug, error};
use url::Url;

/// Create a client for `uri` using the process-wide registry
///
/// The URI's scheme selects the transport; the full URI is handed to the
/// transport so it can read its own connection options.
pub async fn new_client(ctx: &CallContext, uri: &str) -> Result<Box<dyn EmbeddingsClient>> {
    new_client_with(ClientRegistry::global(), ctx, uri).await
}

/// Create a client for `uri` using `registry`
pub async fn new_client_with(
    registry: &ClientRegistry,
    ctx: &CallContext,
    uri: &str,
) -> Result<Box<dyn EmbeddingsClient>> {
    let parsed = Url::parse(uri).map_err(|e| EmbeddingsError::invalid_uri(uri, e))?;
    let scheme = parsed.scheme().to_string();

    let init = registry.lookup(&scheme)?;
    debug!("Creating '{}' embeddings client", scheme);

    init(ctx.clone(), parsed).await.map_err(|e| {
        error!("Failed to create '{}' embeddings client: {}", scheme, e);
        EmbeddingsError::Initialization {
            scheme,
            source: Box::new(e),
        }
    })
}
