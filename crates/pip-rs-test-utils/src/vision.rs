//! Label vision fakes.

use async_trait::async_trait;
use pip_rs_protocol::{LabelAnalysis, LabelAttributes, ServiceError, VisionService};

/// Returns the same analysis for every image.
#[derive(Debug, Clone)]
pub struct StubVision {
    analysis: LabelAnalysis,
}

impl StubVision {
    pub fn new(analysis: LabelAnalysis) -> Self {
        Self { analysis }
    }

    /// A confident read of a named label.
    pub fn label(name: &str, vintage: Option<i32>, confidence: f32) -> Self {
        Self::new(LabelAnalysis {
            attributes: LabelAttributes {
                name: Some(name.to_string()),
                vintage,
                ..LabelAttributes::default()
            },
            confidence,
        })
    }

    /// An unreadable image with the model's note attached.
    pub fn unreadable(note: &str, confidence: f32) -> Self {
        Self::new(LabelAnalysis {
            attributes: LabelAttributes {
                additional_info: Some(note.to_string()),
                ..LabelAttributes::default()
            },
            confidence,
        })
    }
}

#[async_trait]
impl VisionService for StubVision {
    async fn analyze(&self, _image_reference: &str) -> Result<LabelAnalysis, ServiceError> {
        Ok(self.analysis.clone())
    }
}

/// Fails every analysis.
#[derive(Debug, Clone, Default)]
pub struct FailingVision;

#[async_trait]
impl VisionService for FailingVision {
    async fn analyze(&self, _image_reference: &str) -> Result<LabelAnalysis, ServiceError> {
        Err(ServiceError::Unavailable("vision offline".to_string()))
    }
}
