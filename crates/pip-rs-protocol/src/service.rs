//! Narrow collaborator interfaces for text generation and label vision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors returned by external model services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service could not be reached or refused the call.
    #[error("service unavailable: {0}")]
    Unavailable(String),
    /// The service answered with something unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A single-shot prompt for the completer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Text generation used for classification fallback, extraction, and prose.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError>;
}

/// Attributes read off a wine label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub wine_type: Option<String>,
    #[serde(default)]
    pub varietal: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Free-form notes from the vision model (e.g. "image is blurry").
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// Vision output: attributes plus a confidence in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelAnalysis {
    pub attributes: LabelAttributes,
    pub confidence: f32,
}

/// Opaque label-reading service.
#[async_trait]
pub trait VisionService: Send + Sync {
    async fn analyze(&self, image_reference: &str) -> Result<LabelAnalysis, ServiceError>;
}
