//! Data models for embedding requests and results

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Request to derive embeddings for a single text or image body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingsRequest {
    /// Correlation identifier, conventionally the image path for image requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Backend model variant (e.g. "s0")
    pub model: String,

    /// Raw text or image bytes
    pub body: Bytes,
}

/// Embeddings derived by a backend model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embeddings {
    /// Echo of the request identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Embedding vector
    #[serde(default)]
    pub embeddings: Vec<f32>,

    /// Number of dimensions in `embeddings`
    #[serde(default)]
    pub dimensions: i32,

    /// Model used for generation
    #[serde(default)]
    pub model: String,

    /// Creation time as Unix epoch seconds
    #[serde(default)]
    pub created: i64,
}

impl EmbeddingsRequest {
    /// Create a request for a text body
    pub fn text(model: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            id: None,
            model: model.into(),
            body: body.into(),
        }
    }

    /// Create a request for an image body, correlated by `id`
    pub fn image(id: impl Into<String>, model: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            id: Some(id.into()),
            model: model.into(),
            body: body.into(),
        }
    }

    /// Set the correlation identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Embeddings {
    /// Whether `dimensions` agrees with the vector length
    pub fn is_consistent(&self) -> bool {
        usize::try_from(self.dimensions).map_or(false, |d| d == self.embeddings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_omits_missing_id() {
        let embeddings = Embeddings {
            id: None,
            embeddings: vec![0.5, -0.25],
            dimensions: 2,
            model: "s0".to_string(),
            created: 1_700_000_000,
        };

        let json = serde_json::to_value(&embeddings).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["dimensions"], 2);
        assert_eq!(json["model"], "s0");
        assert_eq!(json["created"], 1_700_000_000i64);
    }

    #[test]
    fn test_default_is_consistent() {
        assert!(Embeddings::default().is_consistent());

        let broken = Embeddings {
            dimensions: 3,
            embeddings: vec![1.0],
            ..Default::default()
        };
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_image_request_sets_id() {
        let req = EmbeddingsRequest::image("cat.jpg", "s1", vec![0xffu8, 0xd8]);
        assert_eq!(req.id.as_deref(), Some("cat.jpg"));
        assert_eq!(req.body.len(), 2);

        let req = EmbeddingsRequest::text("s0", "hello").with_id("greeting");
        assert_eq!(req.id.as_deref(), Some("greeting"));
    }
}
