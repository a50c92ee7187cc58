//! Error types for the embeddings client

use thiserror::Error;

/// Result type alias for embeddings client operations
pub type Result<T> = std::result::Result<T, EmbeddingsError>;

/// Boxed source error carried by transport failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which client operation produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Text,
    Image,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Text => f.write_str("text embeddings"),
            Operation::Image => f.write_str("image embeddings"),
        }
    }
}

/// Main error type for the embeddings client
#[derive(Error, Debug)]
pub enum EmbeddingsError {
    #[error("Invalid client URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Unregistered client scheme: {0}")]
    UnregisteredScheme(String),

    #[error("Client scheme already registered: {0}")]
    DuplicateScheme(String),

    #[error("TLS configuration error: {0}")]
    TlsConfiguration(String),

    #[error("Failed to load CA certificate from '{path}': {reason}")]
    CaCertificate { path: String, reason: String },

    #[error("Transport error while computing {operation}: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: BoxError,
    },

    #[error("Failed to derive {operation}: {message}")]
    RemoteCall { operation: Operation, message: String },

    #[error("Failed to decode {operation} response: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: BoxError,
    },

    #[error("Request for {0} was cancelled")]
    Cancelled(Operation),

    #[error("Failed to initialize '{scheme}' client: {source}")]
    Initialization {
        scheme: String,
        #[source]
        source: Box<EmbeddingsError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`EmbeddingsError`] for typed handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUri,
    UnregisteredScheme,
    DuplicateScheme,
    TlsConfiguration,
    CaCertificate,
    Transport,
    RemoteCall,
    Decode,
    Cancelled,
    Config,
    Io,
}

impl EmbeddingsError {
    /// Kind of this error. Initialization wrappers report the kind of the
    /// error the transport returned.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbeddingsError::InvalidUri { .. } => ErrorKind::InvalidUri,
            EmbeddingsError::UnregisteredScheme(_) => ErrorKind::UnregisteredScheme,
            EmbeddingsError::DuplicateScheme(_) => ErrorKind::DuplicateScheme,
            EmbeddingsError::TlsConfiguration(_) => ErrorKind::TlsConfiguration,
            EmbeddingsError::CaCertificate { .. } => ErrorKind::CaCertificate,
            EmbeddingsError::Transport { .. } => ErrorKind::Transport,
            EmbeddingsError::RemoteCall { .. } => ErrorKind::RemoteCall,
            EmbeddingsError::Decode { .. } => ErrorKind::Decode,
            EmbeddingsError::Cancelled(_) => ErrorKind::Cancelled,
            EmbeddingsError::Initialization { source, .. } => source.kind(),
            EmbeddingsError::Config(_) => ErrorKind::Config,
            EmbeddingsError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_uri(uri: impl Into<String>, reason: impl ToString) -> Self {
        EmbeddingsError::InvalidUri {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transport(operation: Operation, source: impl Into<BoxError>) -> Self {
        EmbeddingsError::Transport {
            operation,
            source: source.into(),
        }
    }
}

impl From<config::ConfigError> for EmbeddingsError {
    fn from(err: config::ConfigError) -> Self {
        EmbeddingsError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_reports_inner_kind() {
        let err = EmbeddingsError::Initialization {
            scheme: "grpc".to_string(),
            source: Box::new(EmbeddingsError::CaCertificate {
                path: "/tmp/ca.pem".to_string(),
                reason: "no certificates found".to_string(),
            }),
        };

        assert_eq!(err.kind(), ErrorKind::CaCertificate);
        assert!(err.to_string().contains("grpc"));
    }

    #[test]
    fn test_operation_in_message() {
        let err = EmbeddingsError::Cancelled(Operation::Image);
        assert_eq!(err.to_string(), "Request for image embeddings was cancelled");
    }
}
