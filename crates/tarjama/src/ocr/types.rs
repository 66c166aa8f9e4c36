//! OCR result types.

use crate::types::BoundingBox;
use serde::{Deserialize, Serialize};

/// A single recognized text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSpan {
    pub text: String,
    /// Recognition confidence in [0.0, 1.0].
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl OcrSpan {
    pub fn new(text: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }
}
