//! Core data types for asynchronous jobs and schema validation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of an asynchronous job.
///
/// Transitions are monotonic and one-directional:
/// `queued → in_progress → {completed | failed | cancelled}`, with
/// `queued → cancelled` also permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A tracked asynchronous tool invocation.
///
/// Owned exclusively by the job manager; snapshots of it are handed out to
/// callers, never live references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub request_id: String,
    pub tool_id: String,
    pub status: JobStatus,
    /// Last value reported by the executor, in `[0, 100]`. No monotonicity
    /// is enforced.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ttl_deadline: DateTime<Utc>,
}

/// Projection of a [`Job`] returned synchronously on submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    pub request_id: String,
    pub job_id: String,
    pub status: JobStatus,
    /// Suggested delay before the next poll, in milliseconds.
    pub poll_after: u64,
}

/// Outcome of a finished (or coerced) job, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    Success,
    Error,
}

/// Terminal projection of a [`Job`], returned by resume and by inline
/// (synchronous) execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub request_id: String,
    pub status: JobOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A page of jobs plus the total count matching the filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListing {
    pub jobs: Vec<Job>,
    /// Full count of jobs matching the filter, independent of the page size.
    pub total: usize,
}

/// Construction-time settings for the job manager.
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Maximum number of non-terminal jobs held at once. Submissions beyond
    /// this are rejected.
    pub max_jobs: usize,
    /// Duration after which a job record becomes unreachable and is purged,
    /// terminal or not.
    pub job_ttl: Duration,
    /// Constant `poll_after` hint stamped on every job handle.
    pub poll_after: Duration,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            max_jobs: 64,
            job_ttl: Duration::from_secs(300),
            poll_after: Duration::from_millis(250),
        }
    }
}

/// Result of validating a payload against a tool schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl SchemaValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}
