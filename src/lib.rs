//! Embeddings Client - pluggable clients for remote embedding services
//!
//! Clients are selected by the scheme of a connection URI. Each transport
//! registers an initializer for its scheme in a process-wide registry, and
//! [`new_client`] resolves a URI to a ready-to-use [`EmbeddingsClient`]
//! without the caller naming a concrete transport.
//!
//! ## Transports
//!
//! - `grpc://host:port`: gRPC, optionally with client TLS
//! - `http://` / `https://`: raw body POST, JSON response
//! - `null://`: returns zero-valued embeddings, for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use embeddings_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = CallContext::new();
//!     let client = new_client(&ctx, "grpc://localhost:8080").await?;
//!
//!     let req = EmbeddingsRequest::text("s0", "a photograph of a cat");
//!     let embeddings = client.compute_text_embeddings(&ctx, &req).await?;
//!
//!     println!("{} dimensions", embeddings.dimensions);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod observability;
pub mod registry;
pub mod transport;

pub use client::{new_client, new_client_with};
pub use config::Config;
pub use context::CallContext;
pub use embedding::{Embeddings, EmbeddingsClient, EmbeddingsRequest};
pub use error::{EmbeddingsError, ErrorKind, Result};
pub use registry::{register_client, schemes, ClientRegistry};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{new_client, new_client_with};
    pub use crate::context::CallContext;
    pub use crate::embedding::{Embeddings, EmbeddingsClient, EmbeddingsRequest};
    pub use crate::error::{EmbeddingsError, ErrorKind, Result};
    pub use crate::registry::{initializer, register_client, ClientInitializer, ClientRegistry};
}
