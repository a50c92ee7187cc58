//! Scheme-keyed registry of embeddings client initializers
//!
//! Every transport registers an initializer under the URI scheme it serves.
//! [`crate::new_client`] resolves a connection URI's scheme against the
//! process-wide registry, so new transports plug in without the factory or
//! its callers naming concrete client types.

use crate::context::CallContext;
use crate::embedding::EmbeddingsClient;
use crate::error::{EmbeddingsError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use url::Url;

/// Constructor registered for a scheme. Receives the full parsed URI so the
/// transport can read its own host, path and query options.
pub type ClientInitializer = Arc<
    dyn Fn(CallContext, Url) -> BoxFuture<'static, Result<Box<dyn EmbeddingsClient>>>
        + Send
        + Sync,
>;

/// Wrap an async constructor function as a [`ClientInitializer`]
pub fn initializer<F, Fut>(f: F) -> ClientInitializer
where
    F: Fn(CallContext, Url) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Box<dyn EmbeddingsClient>>> + Send + 'static,
{
    Arc::new(move |ctx, uri| Box::pin(f(ctx, uri)))
}

static GLOBAL_REGISTRY: OnceLock<ClientRegistry> = OnceLock::new();

/// Table of scheme → initializer
///
/// Schemes are matched case-insensitively. Registering a scheme twice is an
/// error; the first registration stays in place.
#[derive(Default)]
pub struct ClientRegistry {
    initializers: DashMap<String, ClientInitializer>,
}

fn normalize(scheme: &str) -> String {
    scheme.trim().trim_end_matches("://").to_ascii_lowercase()
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    ///
    /// Built on first use, at which point the built-in transports register
    /// themselves.
    pub fn global() -> &'static ClientRegistry {
        GLOBAL_REGISTRY.get_or_init(|| {
            let registry = ClientRegistry::new();
            crate::transport::register_builtin(&registry);
            info!("Initialized client registry with schemes {:?}", registry.schemes());
            registry
        })
    }

    /// Register `initializer` under `scheme`
    pub fn register(&self, scheme: &str, initializer: ClientInitializer) -> Result<()> {
        let key = normalize(scheme);

        if key.is_empty() {
            return Err(EmbeddingsError::invalid_uri(scheme, "scheme cannot be empty"));
        }

        match self.initializers.entry(key) {
            Entry::Occupied(entry) => Err(EmbeddingsError::DuplicateScheme(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!("Registered client scheme '{}'", entry.key());
                entry.insert(initializer);
                Ok(())
            }
        }
    }

    /// Look up the initializer registered for `scheme`
    pub fn lookup(&self, scheme: &str) -> Result<ClientInitializer> {
        let key = normalize(scheme);

        self.initializers
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(EmbeddingsError::UnregisteredScheme(key))
    }

    /// Remove the initializer registered for `scheme`, returning whether one existed
    pub fn unregister(&self, scheme: &str) -> bool {
        self.initializers.remove(&normalize(scheme)).is_some()
    }

    /// Whether `scheme` has a registered initializer
    pub fn contains(&self, scheme: &str) -> bool {
        self.initializers.contains_key(&normalize(scheme))
    }

    /// Registered schemes as sorted `"<scheme>://"` prefixes
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self
            .initializers
            .iter()
            .map(|entry| format!("{}://", entry.key()))
            .collect();

        schemes.sort();
        schemes
    }
}

/// Register `initializer` under `scheme` in the process-wide registry
pub fn register_client(scheme: &str, initializer: ClientInitializer) -> Result<()> {
    ClientRegistry::global().register(scheme, initializer)
}

/// Schemes registered in the process-wide registry
pub fn schemes() -> Vec<String> {
    ClientRegistry::global().schemes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embeddings, EmbeddingsRequest};
    use crate::error::ErrorKind;
    use async_trait::async_trait;

    struct FixedClient(i64);

    #[async_trait]
    impl EmbeddingsClient for FixedClient {
        async fn compute_text_embeddings(
            &self,
            _ctx: &CallContext,
            _req: &EmbeddingsRequest,
        ) -> Result<Embeddings> {
            Ok(Embeddings {
                created: self.0,
                ..Default::default()
            })
        }

        async fn compute_image_embeddings(
            &self,
            ctx: &CallContext,
            req: &EmbeddingsRequest,
        ) -> Result<Embeddings> {
            self.compute_text_embeddings(ctx, req).await
        }
    }

    fn fixed(created: i64) -> ClientInitializer {
        initializer(move |_ctx, _uri| async move {
            Ok(Box::new(FixedClient(created)) as Box<dyn EmbeddingsClient>)
        })
    }

    #[test]
    fn test_lookup_returns_registered_initializer() {
        let registry = ClientRegistry::new();
        let init = fixed(1);

        registry.register("fixed", init.clone()).unwrap();

        let found = registry.lookup("fixed").unwrap();
        assert!(Arc::ptr_eq(&found, &init));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ClientRegistry::new();
        registry.register("Fixed", fixed(1)).unwrap();

        assert!(registry.lookup("FIXED").is_ok());
        assert!(registry.contains("fixed"));
    }

    #[test]
    fn test_unregistered_scheme() {
        let registry = ClientRegistry::new();
        let err = registry.lookup("bogus").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnregisteredScheme);
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first() {
        let registry = ClientRegistry::new();
        registry.register("fixed", fixed(1)).unwrap();

        let err = registry.register("FIXED", fixed(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateScheme);

        let init = registry.lookup("fixed").unwrap();
        let client = init(CallContext::new(), Url::parse("fixed://x").unwrap())
            .await
            .unwrap();
        let req = EmbeddingsRequest::text("s0", "");
        let emb = client
            .compute_text_embeddings(&CallContext::new(), &req)
            .await
            .unwrap();
        assert_eq!(emb.created, 1);
    }

    #[test]
    fn test_empty_scheme_rejected() {
        let registry = ClientRegistry::new();
        let err = registry.register("  ", fixed(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUri);
    }

    #[test]
    fn test_schemes_sorted_and_prefixed() {
        let registry = ClientRegistry::new();
        registry.register("Zeta", fixed(1)).unwrap();
        registry.register("alpha", fixed(1)).unwrap();
        registry.register("mid://", fixed(1)).unwrap();

        assert_eq!(registry.schemes(), vec!["alpha://", "mid://", "zeta://"]);
    }

    #[test]
    fn test_unregister() {
        let registry = ClientRegistry::new();
        registry.register("fixed", fixed(1)).unwrap();

        assert!(registry.unregister("fixed"));
        assert!(!registry.unregister("fixed"));
        assert!(registry.register("fixed", fixed(2)).is_ok());
    }
}
