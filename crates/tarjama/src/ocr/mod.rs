//! OCR fusion subsystem.
//!
//! Runs one or more OCR backends over a page image and merges their
//! outputs into a single span list for segmentation. The actual
//! recognition engines live behind [`OcrBackend`]; this module owns the
//! engine-selection policy, the ensemble merge, and best-effort image
//! preprocessing.

pub mod backend;
pub mod fusion;
pub mod preprocess;
pub mod types;

pub use backend::OcrBackend;
pub use fusion::{EnginePlan, recognize_page};
pub use preprocess::preprocess_image;
pub use types::OcrSpan;
