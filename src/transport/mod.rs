//! Built-in embeddings transports

pub mod grpc;
pub mod http;
pub mod null;

pub use grpc::GrpcEmbeddingsClient;
pub use http::HttpEmbeddingsClient;
pub use null::NullEmbeddingsClient;

use crate::error::{EmbeddingsError, Result};
use crate::registry::{initializer, ClientInitializer, ClientRegistry};
use tracing::warn;
use url::Url;

/// Register every built-in transport in `registry`
pub(crate) fn register_builtin(registry: &ClientRegistry) {
    let builtin: [(&str, ClientInitializer); 4] = [
        (grpc::SCHEME, initializer(GrpcEmbeddingsClient::from_uri)),
        (http::SCHEME_HTTP, initializer(HttpEmbeddingsClient::from_uri)),
        (http::SCHEME_HTTPS, initializer(HttpEmbeddingsClient::from_uri)),
        (null::SCHEME, initializer(NullEmbeddingsClient::from_uri)),
    ];

    for (scheme, init) in builtin {
        if let Err(e) = registry.register(scheme, init) {
            warn!("Skipping built-in transport '{}': {}", scheme, e);
        }
    }
}

/// Last non-empty value of query parameter `name`
pub(crate) fn query_param(uri: &Url, name: &str) -> Option<String> {
    uri.query_pairs()
        .filter(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .last()
}

/// Parse a boolean query option, accepting 1/0, t/f and true/false spellings
pub(crate) fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(EmbeddingsError::TlsConfiguration(format!(
            "Failed to parse ?{}= parameter: '{}' is not a boolean",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_ignores_empty_values() {
        let uri = Url::parse("grpc://localhost:8080?tls-key=&tls-certificate=/a.pem").unwrap();
        assert_eq!(query_param(&uri, "tls-key"), None);
        assert_eq!(query_param(&uri, "tls-certificate").as_deref(), Some("/a.pem"));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("tls-insecure", "true").unwrap());
        assert!(parse_bool("tls-insecure", "1").unwrap());
        assert!(!parse_bool("tls-insecure", "False").unwrap());
        assert!(parse_bool("tls-insecure", "yes").is_err());
    }
}
