//! The narrow document-store contract consumed by the worker.
//!
//! The engine itself never performs I/O; everything remote goes through
//! this trait so the Firestore adapter stays swappable and the worker can
//! be exercised against an in-memory store in tests.

use anyhow::Result;
use async_trait::async_trait;

use crate::jobs::{Job, JobPatch};
use crate::pricing::PriceTable;

/// Per-operator persistence of jobs and pricing settings.
///
/// Reads return complete snapshots (full-replace semantics): the caller
/// never diffs, it re-derives its state from each fetch. Writes are
/// fire-and-forget from the UI's point of view; a failed write simply never
/// materializes in the next snapshot.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch the complete job set owned by `uid`.
    async fn fetch_jobs(&self, uid: &str) -> Result<Vec<Job>>;

    /// Create a job document under the id already assigned to `job.id`.
    async fn create_job(&self, job: &Job) -> Result<()>;

    /// Apply a partial update to one job document.
    async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<()>;

    /// Delete one job document permanently.
    async fn delete_job(&self, id: &str) -> Result<()>;

    /// Load the operator's saved price table, if any.
    async fn load_pricing(&self, uid: &str) -> Result<Option<PriceTable>>;

    /// Replace the operator's price table wholesale.
    async fn save_pricing(&self, uid: &str, table: &PriceTable) -> Result<()>;
}
