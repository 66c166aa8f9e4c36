//! Job lifecycle and state machine.
//!
//! A job moves `queued → processing → extracting → ocr → translating →
//! completed`, or to `failed` from any non-terminal state. Three per-stage
//! sub-statuses (extraction, OCR, translation) are tracked independently
//! of the overall status; the overall status is derived from them by
//! [`derive_status`], never stored out of sync.

pub mod store;
pub mod worker;

pub use store::{JobStore, MemoryJobStore};
pub use worker::Worker;

use crate::config::JobConfig;
use crate::extraction::FileType;
use crate::types::{JobStats, StructuredDocument};
use crate::TarjamaError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Overall job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Extracting,
    Ocr,
    Translating,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Sub-status of one processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StageStatus {
    /// Position in the forward-only progression; terminal states rank
    /// equal and cannot replace each other.
    fn rank(self) -> u8 {
        match self {
            StageStatus::Pending => 0,
            StageStatus::InProgress => 1,
            StageStatus::Completed | StageStatus::Failed => 2,
        }
    }
}

/// One of the independently tracked sub-phases of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Ocr,
    Translation,
}

/// The three per-stage sub-statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StageStatuses {
    pub extraction: StageStatus,
    pub ocr: StageStatus,
    pub translation: StageStatus,
}

impl StageStatuses {
    pub fn get(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Extraction => self.extraction,
            Stage::Ocr => self.ocr,
            Stage::Translation => self.translation,
        }
    }

    fn slot(&mut self, stage: Stage) -> &mut StageStatus {
        match stage {
            Stage::Extraction => &mut self.extraction,
            Stage::Ocr => &mut self.ocr,
            Stage::Translation => &mut self.translation,
        }
    }

    pub fn any_failed(&self) -> bool {
        [self.extraction, self.ocr, self.translation]
            .iter()
            .any(|s| *s == StageStatus::Failed)
    }

    pub fn all_completed(&self) -> bool {
        [self.extraction, self.ocr, self.translation]
            .iter()
            .all(|s| *s == StageStatus::Completed)
    }
}

/// Typed outcome of a pipeline stage.
///
/// Fallback paths are visible in the value instead of being inferred from
/// caught errors: a stage that leaned on a fallback engine or per-item
/// retries completes as `Degraded`.
#[derive(Debug)]
pub enum StageOutcome {
    Completed,
    Degraded { reason: String },
    Failed { error: TarjamaError },
}

impl StageOutcome {
    /// Stage status this outcome settles to.
    pub fn stage_status(&self) -> StageStatus {
        match self {
            StageOutcome::Completed | StageOutcome::Degraded { .. } => StageStatus::Completed,
            StageOutcome::Failed { .. } => StageStatus::Failed,
        }
    }
}

/// Derive the overall job status from the per-stage sub-statuses.
///
/// `claimed` distinguishes `queued` from `processing` before any stage
/// starts; `failed` forces the terminal failure state for errors that
/// strike outside a stage (timeouts, store errors).
pub fn derive_status(claimed: bool, stages: &StageStatuses, failed: bool) -> JobStatus {
    if failed || stages.any_failed() {
        return JobStatus::Failed;
    }
    // Completed requires every stage completed, so an overall `completed`
    // always implies three completed sub-statuses.
    if stages.all_completed() {
        return JobStatus::Completed;
    }
    if stages.translation == StageStatus::InProgress {
        return JobStatus::Translating;
    }
    if stages.ocr == StageStatus::InProgress {
        return JobStatus::Ocr;
    }
    if stages.extraction == StageStatus::InProgress {
        return JobStatus::Extracting;
    }
    if claimed {
        JobStatus::Processing
    } else {
        JobStatus::Queued
    }
}

/// A document-processing job record.
///
/// The record is the single source of truth for the job's lifecycle: the
/// worker advances it through the store's read-modify-write updates, and
/// pollers only ever observe committed states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub original_filename: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
    pub stages: StageStatuses,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_document: Option<StructuredDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_document: Option<StructuredDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<JobStats>,

    /// Public error message surfaced to clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Full diagnostic trace, operator-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Configuration snapshot taken at submission time.
    pub config: JobConfig,
}

impl Job {
    pub fn new(
        original_filename: impl Into<String>,
        file_path: impl Into<PathBuf>,
        file_size: u64,
        file_type: FileType,
        config: JobConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Queued,
            original_filename: original_filename.into(),
            file_path: file_path.into(),
            file_size,
            file_type,
            stages: StageStatuses::default(),
            source_document: None,
            translated_document: None,
            stats: None,
            error_message: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            config,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Move the job out of the queue; the claiming worker owns it from
    /// here on.
    pub(crate) fn mark_claimed(&mut self) {
        self.status = JobStatus::Processing;
        self.touch();
    }

    /// Advance one stage's sub-status. Stage statuses are monotonic within
    /// a run: attempts to move backwards (or away from a terminal stage
    /// status) are ignored.
    pub fn set_stage(&mut self, stage: Stage, status: StageStatus) {
        let slot = self.stages.slot(stage);
        if status.rank() <= slot.rank() {
            tracing::warn!(?stage, from = ?*slot, to = ?status, "ignoring stage status regression");
            return;
        }
        *slot = status;
        self.status = derive_status(true, &self.stages, false);
        self.touch();
    }

    /// Terminal success: attach both documents and the aggregated stats.
    pub fn mark_completed(
        &mut self,
        source: StructuredDocument,
        translated: StructuredDocument,
        stats: JobStats,
    ) {
        self.source_document = Some(source);
        self.translated_document = Some(translated);
        self.stats = Some(stats);
        self.status = derive_status(true, &self.stages, false);
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    /// Both terminal documents, available only once the job completed.
    pub fn results(&self) -> crate::Result<(&StructuredDocument, &StructuredDocument)> {
        if self.status != JobStatus::Completed {
            return Err(TarjamaError::InvalidState(format!(
                "job {} is {:?}; results exist only for completed jobs",
                self.id, self.status
            )));
        }
        match (&self.source_document, &self.translated_document) {
            (Some(source), Some(translated)) => Ok((source, translated)),
            _ => Err(TarjamaError::InvalidState(format!(
                "job {} is completed but has no attached documents",
                self.id
            ))),
        }
    }

    /// Terminal failure: attach the public message and the operator-only
    /// diagnostic detail. Prior stage statuses are left as-is so callers
    /// can see which stage failed.
    pub fn mark_failed(&mut self, error: &TarjamaError) {
        self.error_message = Some(error.public_message());
        self.error_detail = Some(error.diagnostic_detail());
        self.status = derive_status(true, &self.stages, true);
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(extraction: StageStatus, ocr: StageStatus, translation: StageStatus) -> StageStatuses {
        StageStatuses {
            extraction,
            ocr,
            translation,
        }
    }

    fn new_job() -> Job {
        Job::new("doc.pdf", "/tmp/doc.pdf", 1024, FileType::Pdf, JobConfig::default())
    }

    #[test]
    fn test_derive_status_table() {
        use StageStatus::*;

        let cases = [
            (false, stages(Pending, Pending, Pending), false, JobStatus::Queued),
            (true, stages(Pending, Pending, Pending), false, JobStatus::Processing),
            (true, stages(InProgress, Pending, Pending), false, JobStatus::Extracting),
            (true, stages(Completed, InProgress, Pending), false, JobStatus::Ocr),
            (true, stages(Completed, Completed, InProgress), false, JobStatus::Translating),
            (true, stages(Completed, Completed, Completed), false, JobStatus::Completed),
            (true, stages(Failed, Pending, Pending), false, JobStatus::Failed),
            (true, stages(Completed, Completed, Failed), false, JobStatus::Failed),
            (true, stages(Completed, Pending, Pending), false, JobStatus::Processing),
            (true, stages(Completed, Completed, InProgress), true, JobStatus::Failed),
        ];

        for (claimed, stages, failed, expected) in cases {
            assert_eq!(
                derive_status(claimed, &stages, failed),
                expected,
                "claimed={claimed} stages={stages:?} failed={failed}"
            );
        }
    }

    #[test]
    fn test_completed_implies_all_stages_completed() {
        use StageStatus::*;
        // exhaustive over the stage status cube
        let all = [Pending, InProgress, Completed, Failed];
        for e in all {
            for o in all {
                for t in all {
                    let s = stages(e, o, t);
                    if derive_status(true, &s, false) == JobStatus::Completed {
                        assert_eq!((e, o, t), (Completed, Completed, Completed));
                    }
                }
            }
        }
    }

    #[test]
    fn test_stage_status_is_monotonic() {
        let mut job = new_job();
        job.set_stage(Stage::Extraction, StageStatus::InProgress);
        job.set_stage(Stage::Extraction, StageStatus::Completed);
        // regression attempts are ignored
        job.set_stage(Stage::Extraction, StageStatus::Pending);
        assert_eq!(job.stages.extraction, StageStatus::Completed);
        job.set_stage(Stage::Extraction, StageStatus::InProgress);
        assert_eq!(job.stages.extraction, StageStatus::Completed);
    }

    #[test]
    fn test_completed_does_not_become_failed() {
        let mut job = new_job();
        job.set_stage(Stage::Extraction, StageStatus::Completed);
        job.set_stage(Stage::Extraction, StageStatus::Failed);
        assert_eq!(job.stages.extraction, StageStatus::Completed);
    }

    #[test]
    fn test_overall_status_follows_stages() {
        let mut job = new_job();
        assert_eq!(job.status, JobStatus::Queued);

        job.mark_claimed();
        assert_eq!(job.status, JobStatus::Processing);

        job.set_stage(Stage::Extraction, StageStatus::InProgress);
        assert_eq!(job.status, JobStatus::Extracting);

        job.set_stage(Stage::Extraction, StageStatus::Completed);
        job.set_stage(Stage::Ocr, StageStatus::InProgress);
        assert_eq!(job.status, JobStatus::Ocr);

        job.set_stage(Stage::Ocr, StageStatus::Completed);
        job.set_stage(Stage::Translation, StageStatus::InProgress);
        assert_eq!(job.status, JobStatus::Translating);

        job.set_stage(Stage::Translation, StageStatus::Completed);
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.stages.all_completed());
    }

    #[test]
    fn test_mark_failed_keeps_stage_statuses() {
        let mut job = new_job();
        job.mark_claimed();
        job.set_stage(Stage::Extraction, StageStatus::Completed);
        job.set_stage(Stage::Ocr, StageStatus::InProgress);

        job.set_stage(Stage::Ocr, StageStatus::Failed);
        job.mark_failed(&TarjamaError::ocr("engine exploded"));

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.stages.extraction, StageStatus::Completed);
        assert_eq!(job.stages.ocr, StageStatus::Failed);
        assert_eq!(job.stages.translation, StageStatus::Pending);
        assert_eq!(job.error_message.as_deref(), Some("engine exploded"));
        assert!(job.error_detail.as_deref().unwrap().contains("OCR error"));
    }

    #[test]
    fn test_mark_completed_stamps_timestamp_and_outputs() {
        let mut job = new_job();
        job.mark_claimed();
        job.set_stage(Stage::Extraction, StageStatus::Completed);
        job.set_stage(Stage::Ocr, StageStatus::Completed);
        job.set_stage(Stage::Translation, StageStatus::Completed);

        let source = StructuredDocument::empty("doc.pdf", "ar", None);
        let translated = StructuredDocument::empty("doc.pdf", "en", None);
        let stats = JobStats::from_documents(&source, &translated);
        job.mark_completed(source, translated, stats);

        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(job.source_document.is_some());
        assert!(job.translated_document.is_some());
        assert!(job.stats.is_some());
    }

    #[test]
    fn test_results_require_completion() {
        let mut job = new_job();
        let err = job.results().unwrap_err();
        assert!(matches!(err, TarjamaError::InvalidState(_)));

        job.mark_claimed();
        job.set_stage(Stage::Extraction, StageStatus::Completed);
        job.set_stage(Stage::Ocr, StageStatus::Completed);
        job.set_stage(Stage::Translation, StageStatus::Completed);
        let source = StructuredDocument::empty("doc.pdf", "ar", None);
        let translated = StructuredDocument::empty("doc.pdf", "en", None);
        let stats = JobStats::from_documents(&source, &translated);
        job.mark_completed(source, translated, stats);

        let (src, dst) = job.results().unwrap();
        assert_eq!(src.language, "ar");
        assert_eq!(dst.language, "en");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobStatus::Translating).unwrap(), "\"translating\"");
        assert_eq!(serde_json::to_string(&StageStatus::InProgress).unwrap(), "\"in_progress\"");
    }

    #[test]
    fn test_stage_outcome_statuses() {
        assert_eq!(StageOutcome::Completed.stage_status(), StageStatus::Completed);
        assert_eq!(
            StageOutcome::Degraded {
                reason: "fallback engine used".to_string()
            }
            .stage_status(),
            StageStatus::Completed
        );
        assert_eq!(
            StageOutcome::Failed {
                error: TarjamaError::ocr("down")
            }
            .stage_status(),
            StageStatus::Failed
        );
    }
}
