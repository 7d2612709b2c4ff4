//! Errors raised by the job manager to its callers.

/// Caller-facing job manager errors.
///
/// `NotFound` and `CapacityExceeded` indicate caller misuse or backpressure;
/// executor failures never surface here — they are captured into the job
/// record as `status = failed`.
#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job capacity exceeded: {active} active jobs (limit {limit})")]
    CapacityExceeded { active: usize, limit: usize },
}
