//! Configuration loading and management.
//!
//! [`JobConfig`] is the per-job snapshot persisted on the job record;
//! [`PipelineConfig`] carries worker-level knobs. Both can be loaded from
//! TOML files or created programmatically.

use crate::{Result, TarjamaError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// OCR engine selection policy, configurable per job.
///
/// Serialized as a plain string: an engine name selects single-engine mode,
/// the literal `"ensemble"` runs primary and fallback engines and merges
/// their results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OcrEngineSelection {
    /// Run exactly this engine; if it yields zero results and fallback is
    /// enabled, run the fallback engine.
    Single(String),
    /// Run both engines and merge by exact-bbox key.
    Ensemble,
}

impl From<String> for OcrEngineSelection {
    fn from(value: String) -> Self {
        if value == "ensemble" {
            OcrEngineSelection::Ensemble
        } else {
            OcrEngineSelection::Single(value)
        }
    }
}

impl From<OcrEngineSelection> for String {
    fn from(value: OcrEngineSelection) -> Self {
        match value {
            OcrEngineSelection::Single(engine) => engine,
            OcrEngineSelection::Ensemble => "ensemble".to_string(),
        }
    }
}

impl OcrEngineSelection {
    /// Engine name recorded in document metadata.
    pub fn label(&self) -> &str {
        match self {
            OcrEngineSelection::Single(engine) => engine,
            OcrEngineSelection::Ensemble => "ensemble",
        }
    }
}

/// Per-job configuration snapshot.
///
/// Stored on the job record at submission time; the worker reads only this
/// snapshot, so later config changes never affect a running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// OCR engine choice for scanned/image pages.
    #[serde(default = "default_ocr_engine")]
    pub ocr_engine: OcrEngineSelection,

    /// Source language tag in the translation backend's format.
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language tag in the translation backend's format.
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation model identifier, recorded for reproducibility.
    #[serde(default = "default_translation_model")]
    pub translation_model: String,

    /// Number of block texts per translation batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pass text through untranslated when it is already in the target
    /// language.
    #[serde(default = "default_true")]
    pub skip_if_target_language: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            ocr_engine: default_ocr_engine(),
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation_model: default_translation_model(),
            batch_size: default_batch_size(),
            skip_if_target_language: true,
        }
    }
}

/// Segmentation thresholds.
///
/// Distances are in the source coordinate space: pixels for OCR-derived
/// positions, points for vector PDF text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Vertical gap below which OCR fragments join the open block.
    #[serde(default = "default_ocr_proximity")]
    pub ocr_proximity_threshold: f32,

    /// Vertical gap below which vector-PDF fragments join the open block.
    #[serde(default = "default_vector_proximity")]
    pub vector_proximity_threshold: f32,

    /// Minimum extracted character count for a page's vector text to be
    /// used verbatim; shorter pages are rasterized and OCR'd.
    #[serde(default = "default_min_vector_text_chars")]
    pub min_vector_text_chars: usize,

    /// Upscale factor applied when rasterizing a page for OCR.
    #[serde(default = "default_raster_scale")]
    pub raster_scale: f32,

    /// Font size at or above which a vector fragment's block is a heading.
    #[serde(default = "default_heading_size_cutoff")]
    pub heading_size_cutoff: f32,

    /// Font size at or above which a heading is level 1; smaller headings
    /// are level 2.
    #[serde(default = "default_heading_major_size")]
    pub heading_major_size: f32,

    /// Height of the top-of-page band in which blocks are headings.
    #[serde(default = "default_heading_top_band")]
    pub heading_top_band: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            ocr_proximity_threshold: default_ocr_proximity(),
            vector_proximity_threshold: default_vector_proximity(),
            min_vector_text_chars: default_min_vector_text_chars(),
            raster_scale: default_raster_scale(),
            heading_size_cutoff: default_heading_size_cutoff(),
            heading_major_size: default_heading_major_size(),
            heading_top_band: default_heading_top_band(),
        }
    }
}

/// Worker-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Registry name of the primary (high-accuracy) OCR backend.
    #[serde(default = "default_primary_engine")]
    pub primary_ocr_engine: String,

    /// Registry name of the fallback OCR backend.
    #[serde(default = "default_fallback_engine")]
    pub fallback_ocr_engine: String,

    /// Run the fallback engine when the selected engine returns nothing.
    #[serde(default = "default_true")]
    pub use_ocr_fallback: bool,

    /// Registry name of the translation backend.
    #[serde(default = "default_translation_backend")]
    pub translation_backend: String,

    /// Hard wall-clock budget for a whole job, in seconds.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Maximum concurrent translation batch calls (None = sequential).
    /// Batches are order-independent, so this never changes results.
    #[serde(default)]
    pub max_batch_concurrency: Option<usize>,

    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary_ocr_engine: default_primary_engine(),
            fallback_ocr_engine: default_fallback_engine(),
            use_ocr_fallback: true,
            translation_backend: default_translation_backend(),
            job_timeout_secs: default_job_timeout_secs(),
            max_batch_concurrency: None,
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            TarjamaError::validation_with_source(
                format!("invalid pipeline config in {}", path.display()),
                e,
            )
        })
    }
}

fn default_ocr_engine() -> OcrEngineSelection {
    OcrEngineSelection::Single(default_primary_engine())
}

fn default_source_language() -> String {
    "ara_Arab".to_string()
}

fn default_target_language() -> String {
    "eng_Latn".to_string()
}

fn default_translation_model() -> String {
    "facebook/nllb-200-3.3B".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_primary_engine() -> String {
    "paddle".to_string()
}

fn default_fallback_engine() -> String {
    "tesseract".to_string()
}

fn default_translation_backend() -> String {
    "nllb".to_string()
}

fn default_job_timeout_secs() -> u64 {
    30 * 60
}

fn default_ocr_proximity() -> f32 {
    30.0
}

fn default_vector_proximity() -> f32 {
    10.0
}

fn default_min_vector_text_chars() -> usize {
    10
}

fn default_raster_scale() -> f32 {
    2.0
}

fn default_heading_size_cutoff() -> f32 {
    16.0
}

fn default_heading_major_size() -> f32 {
    24.0
}

fn default_heading_top_band() -> f32 {
    80.0
}

fn default_true() -> bool {
    true
}
