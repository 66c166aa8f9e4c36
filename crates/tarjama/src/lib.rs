//! Tarjama - Structured Document Translation Pipeline
//!
//! Tarjama ingests a scanned or digital document (PDF, DOCX, or image),
//! extracts its text while preserving logical structure, translates it
//! into a target language, and exposes both structured representations
//! plus derived statistics through an asynchronously processed job record.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tarjama::config::{JobConfig, PipelineConfig};
//! use tarjama::extraction::{FileType, RawDocument};
//! use tarjama::job::{Job, JobStore, MemoryJobStore, Worker};
//!
//! # async fn example(source: RawDocument) -> tarjama::Result<()> {
//! let store = Arc::new(MemoryJobStore::new());
//! let job = Job::new("report.pdf", "/uploads/report.pdf", 4096, FileType::Pdf, JobConfig::default());
//! let job_id = job.id.clone();
//! store.create(job)?;
//!
//! let worker = Worker::new(store.clone(), PipelineConfig::default());
//! let finished = worker.run_job(&job_id, &source).await?;
//! println!("job ended as {:?}", finished.status);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Document model** (`types`): the page/block container shared by
//!   every stage
//! - **Segmentation** (`segmentation`): spatial grouping of raw positioned
//!   text into ordered, classified blocks
//! - **OCR fusion** (`ocr`): multi-backend recognition with ensemble
//!   merging and fallback
//! - **Translation** (`translation`): batched, structure-preserving
//!   document translation
//! - **Job state machine** (`job`): status derivation, the store seam, and
//!   the worker driving a job to a terminal state
//!
//! Recognition engines, translation models, and document parsers are
//! external collaborators plugged in behind the `OcrBackend`,
//! `TranslationBackend`, and `DocumentSource` traits.

#![deny(unsafe_code)]

pub mod backends;
pub mod config;
pub mod error;
pub mod extraction;
pub mod job;
pub mod language;
pub mod ocr;
pub mod segmentation;
pub mod text;
pub mod translation;
pub mod types;

pub use error::{Result, TarjamaError};
pub use types::*;

pub use backends::{
    get_ocr_backend_registry, get_translation_backend_registry, register_ocr_backend,
    register_translation_backend, Backend,
};
pub use config::{JobConfig, OcrEngineSelection, PipelineConfig, SegmentationConfig};
pub use job::{
    derive_status, Job, JobStatus, JobStore, MemoryJobStore, Stage, StageOutcome, StageStatus,
    StageStatuses, Worker,
};
