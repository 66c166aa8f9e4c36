//! OCR backend trait.
//!
//! Implement this trait to plug a recognition engine into the pipeline.
//! At least two variants are expected in production: a primary
//! high-accuracy engine and a fallback engine usable when the primary is
//! unavailable or underperforms.

use crate::backends::Backend;
use crate::extraction::PageImage;
use crate::ocr::types::OcrSpan;
use crate::Result;
use async_trait::async_trait;

/// Trait for OCR recognition engines.
///
/// Backends must be thread-safe (`Send + Sync`); they are stored in
/// `Arc<dyn OcrBackend>` and shared across jobs. Engine state (loaded
/// models, native handles) lives behind interior mutability.
#[async_trait]
pub trait OcrBackend: Backend {
    /// Recognize text regions in an image.
    ///
    /// Returns a flat list of spans; an empty list is a valid answer for a
    /// blank page. Backend failures are absorbed by the fusion layer and
    /// never abort the job.
    async fn recognize(&self, image: &PageImage) -> Result<Vec<OcrSpan>>;
}
