//! Job persistence seam.
//!
//! The pipeline mutates jobs exclusively through [`JobStore`]: claim and
//! stage transitions are read-modify-write operations under the record's
//! own lock, so there are no lost updates under single-writer access and
//! pollers always observe the last committed state. [`MemoryJobStore`] is
//! the in-process reference implementation; persistent stores implement
//! the same trait.

use crate::job::{Job, JobStatus};
use crate::{Result, TarjamaError};
use ahash::AHashMap;
use parking_lot::RwLock;

/// Create/read/update access to job records.
pub trait JobStore: Send + Sync {
    /// Insert a new job. Fails on duplicate id.
    fn create(&self, job: Job) -> Result<()>;

    /// Snapshot of the job's last committed state.
    fn get(&self, id: &str) -> Result<Job>;

    /// Atomic read-modify-write of one job record.
    fn update(&self, id: &str, mutate: &mut dyn FnMut(&mut Job)) -> Result<()>;

    /// Claim a queued job for processing.
    ///
    /// Exactly one claim succeeds per run: the transition
    /// `queued → processing` happens under the record's lock, so a second
    /// claimer gets `InvalidState`.
    fn claim(&self, id: &str) -> Result<Job>;

    /// All jobs, newest first.
    fn list(&self) -> Result<Vec<Job>>;
}

/// In-memory job store.
///
/// Equivalent to single-job-at-a-time synchronous execution: one lock per
/// store, clone-out reads, and mutation only inside `update`/`claim`.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<AHashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn create(&self, job: Job) -> Result<()> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(TarjamaError::InvalidState(format!(
                "job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Job> {
        self.jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TarjamaError::NotFound(format!("job {id} not found")))
    }

    fn update(&self, id: &str, mutate: &mut dyn FnMut(&mut Job)) -> Result<()> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| TarjamaError::NotFound(format!("job {id} not found")))?;
        mutate(job);
        Ok(())
    }

    fn claim(&self, id: &str) -> Result<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| TarjamaError::NotFound(format!("job {id} not found")))?;
        if job.status != JobStatus::Queued {
            return Err(TarjamaError::InvalidState(format!(
                "job {id} is {:?}, not queued",
                job.status
            )));
        }
        job.mark_claimed();
        Ok(job.clone())
    }

    fn list(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}
