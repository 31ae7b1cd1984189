//! Job data types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("No files provided")]
    EmptyFileList,
}

/// Progress snapshot of one batch conversion job.
///
/// Mutated in place by exactly one worker under the runner's lock;
/// reads are whole-struct clones, so a snapshot is always consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque unique token issued at submission.
    pub job_id: String,
    /// Number of files in the batch, fixed at creation.
    pub total: u32,
    /// Files handled so far; only ever increases.
    pub processed: u32,
    /// Files converted successfully.
    pub success: u32,
    /// Files that failed.
    pub failed: u32,
    /// Name of the file currently being processed.
    pub current_file: Option<String>,
    /// Human-readable progress message, most-recently-set wins.
    pub message: Option<String>,
    /// True once every file has been handled; never reset.
    pub done: bool,
}

impl Job {
    pub(crate) fn new(job_id: String, total: u32) -> Self {
        Self {
            job_id,
            total,
            processed: 0,
            success: 0,
            failed: 0,
            current_file: None,
            message: None,
            done: false,
        }
    }
}
