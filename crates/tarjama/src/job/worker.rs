//! The worker that drives a claimed job through the pipeline.
//!
//! One worker processes one job at a time to completion: segmentation
//! (with OCR fusion per page where needed), normalization, translation,
//! statistics, then the terminal commit. Every stage boundary commits
//! through the job store before the next stage begins, so a crash leaves
//! the job in a safely observable state. The whole job runs under a hard
//! wall-clock budget; on expiry it is marked failed with no partial
//! salvage.

use crate::backends::{get_ocr_backend_registry, get_translation_backend_registry};
use crate::config::{OcrEngineSelection, PipelineConfig};
use crate::extraction::DocumentSource;
use crate::job::{Job, JobStore, Stage, StageOutcome, StageStatus};
use crate::language::short_tag;
use crate::ocr::EnginePlan;
use crate::segmentation::SegmentationEngine;
use crate::text::normalize;
use crate::translation::translate_document;
use crate::types::{JobStats, StructuredDocument};
use crate::{Result, TarjamaError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Single-job pipeline driver.
pub struct Worker {
    store: Arc<dyn JobStore>,
    config: PipelineConfig,
}

impl Worker {
    pub fn new(store: Arc<dyn JobStore>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Claim and run one job to a terminal state.
    ///
    /// Pipeline failures are recorded on the job record and do not error
    /// here; the returned snapshot is the job's terminal state. Errors are
    /// store-level only (unknown id, double claim).
    pub async fn run_job(&self, job_id: &str, source: &dyn DocumentSource) -> Result<Job> {
        let job = self.store.claim(job_id)?;
        tracing::info!(job = %job.id, file = %job.original_filename, "processing job");

        let budget = Duration::from_secs(self.config.job_timeout_secs);
        match tokio::time::timeout(budget, self.process(&job, source)).await {
            Ok(Ok(())) => {
                tracing::info!(job = %job.id, "job completed");
            }
            Ok(Err(err)) => {
                tracing::error!(job = %job.id, error = %err, "job failed");
                self.store.update(job_id, &mut |j| j.mark_failed(&err))?;
            }
            Err(_elapsed) => {
                let err = TarjamaError::Timeout(format!(
                    "job exceeded its {}s wall-clock budget",
                    self.config.job_timeout_secs
                ));
                tracing::error!(job = %job.id, "job timed out");
                self.store.update(job_id, &mut |j| j.mark_failed(&err))?;
            }
        }

        self.store.get(job_id)
    }

    async fn process(&self, job: &Job, source: &dyn DocumentSource) -> Result<()> {
        let started = Instant::now();
        let job_id = &job.id;
        let config = &job.config;

        // Extraction: segmentation over raw pages, OCR fusion where needed.
        self.commit(job_id, Stage::Extraction, StageStatus::InProgress)?;

        let plan = self.resolve_ocr_plan(&config.ocr_engine);
        let engine = SegmentationEngine::new(&self.config.segmentation, plan.as_ref());
        let segmented = match engine.segment_document(source).await {
            Ok(segmented) => segmented,
            Err(err) => {
                self.commit(job_id, Stage::Extraction, StageStatus::Failed)?;
                return Err(err);
            }
        };

        let mut source_doc = StructuredDocument::empty(
            &job.original_filename,
            short_tag(&config.source_language),
            segmented.ocr_used.then(|| config.ocr_engine.label().to_string()),
        );
        source_doc.set_pages(segmented.pages);

        // Normalization runs exactly once per block, before translation.
        for page in &mut source_doc.pages {
            for block in &mut page.blocks {
                block.text = normalize(&block.text);
            }
        }

        self.commit(job_id, Stage::Extraction, StageStatus::Completed)?;

        // OCR recognition itself ran during segmentation; the stage status
        // records whether any page needed it.
        if segmented.ocr_used {
            self.commit(job_id, Stage::Ocr, StageStatus::InProgress)?;
        }
        self.commit(job_id, Stage::Ocr, StageStatus::Completed)?;

        // Translation.
        self.commit(job_id, Stage::Translation, StageStatus::InProgress)?;

        let backend = match get_translation_backend_registry()
            .read()
            .get(&self.config.translation_backend)
        {
            Ok(backend) => backend,
            Err(err) => {
                self.commit(job_id, Stage::Translation, StageStatus::Failed)?;
                return Err(err);
            }
        };

        let outcome =
            translate_document(&source_doc, backend, config, self.config.max_batch_concurrency).await;

        let stage_outcome = if outcome.is_degraded() {
            StageOutcome::Degraded {
                reason: format!(
                    "{} blocks fell back to item-level translation",
                    outcome.degraded_blocks
                ),
            }
        } else {
            StageOutcome::Completed
        };
        if let StageOutcome::Degraded { reason } = &stage_outcome {
            tracing::warn!(job = %job_id, reason, "translation completed degraded");
        }
        self.commit(job_id, Stage::Translation, stage_outcome.stage_status())?;

        // Statistics and the terminal commit.
        let mut translated = outcome.document;
        let elapsed = started.elapsed().as_secs_f64();
        source_doc.metadata.processing_time_seconds = Some(elapsed);
        translated.metadata.processing_time_seconds = Some(elapsed);

        let stats = JobStats::from_documents(&source_doc, &translated);
        self.store.update(job_id, &mut |j| {
            j.mark_completed(source_doc.clone(), translated.clone(), stats)
        })?;

        Ok(())
    }

    fn commit(&self, job_id: &str, stage: Stage, status: StageStatus) -> Result<()> {
        self.store.update(job_id, &mut |job| job.set_stage(stage, status))
    }

    /// Resolve the configured engine selection against the registry.
    ///
    /// Missing engines degrade: ensemble with one engine available runs
    /// single-engine, and no engines at all yields `None` (pages that then
    /// need OCR fail extraction).
    fn resolve_ocr_plan(&self, selection: &OcrEngineSelection) -> Option<EnginePlan> {
        let registry = get_ocr_backend_registry();
        let registry = registry.read();

        match selection {
            OcrEngineSelection::Single(name) => {
                let engine = match registry.get(name) {
                    Ok(engine) => engine,
                    Err(err) => {
                        tracing::warn!(engine = %name, error = %err, "selected OCR engine unavailable");
                        return None;
                    }
                };
                let fallback = if self.config.use_ocr_fallback
                    && *name != self.config.fallback_ocr_engine
                {
                    registry.get(&self.config.fallback_ocr_engine).ok()
                } else {
                    None
                };
                Some(EnginePlan::Single { engine, fallback })
            }
            OcrEngineSelection::Ensemble => {
                let primary = registry.get(&self.config.primary_ocr_engine).ok();
                let secondary = registry.get(&self.config.fallback_ocr_engine).ok();
                match (primary, secondary) {
                    (Some(primary), Some(secondary)) => {
                        Some(EnginePlan::Ensemble { primary, secondary })
                    }
                    (Some(engine), None) | (None, Some(engine)) => {
                        tracing::warn!("only one ensemble engine available, running single");
                        Some(EnginePlan::Single {
                            engine,
                            fallback: None,
                        })
                    }
                    (None, None) => None,
                }
            }
        }
    }
}
