//! Asynchronous job table and lifecycle state machine.
//!
//! The manager owns a per-instance job table; multiple independent managers
//! can coexist. All mutations to a given job record are serialized through
//! its slot lock, while operations on distinct jobs proceed concurrently.
//! `submit`, `poll`, `list`, and `cancel` never suspend the caller; `resume`
//! is the only suspension point and is bounded by the job's remaining TTL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockWriteGuard, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::JobError;
use crate::events::{EventSink, GatewayEvent};
use crate::types::{
    Job, JobHandle, JobListing, JobManagerConfig, JobOutcome, JobResult, JobStatus,
};

/// An opaque unit of work driven by the job manager.
///
/// Executors receive the request's arguments, a progress reporter, and a
/// cooperative cancellation token. Returning `Err` (or panicking) marks the
/// job `failed`; the error never propagates out of the manager.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn run(
        &self,
        arguments: Value,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> anyhow::Result<Value>;
}

/// Reports executor progress back into the job table.
///
/// Holds only a weak reference to the job slot: a reporter outliving its job
/// (TTL purge, explicit removal) degrades to a no-op.
#[derive(Clone)]
pub struct ProgressReporter {
    slot: Weak<JobSlot>,
}

impl ProgressReporter {
    /// A reporter not attached to any job. Used for inline (synchronous)
    /// execution, where there is no job record to update.
    pub fn detached() -> Self {
        Self { slot: Weak::new() }
    }

    /// Record the executor's latest progress, clamped to `[0, 100]`.
    /// Ignored once the job has reached a terminal state.
    pub fn report(&self, percent: u8) {
        if let Some(slot) = self.slot.upgrade() {
            let mut job = slot.lock_state();
            if !job.status.is_terminal() {
                job.progress = percent.min(100);
                job.updated_at = Utc::now();
            }
        }
    }
}

/// One entry in the job table. The inner mutex serializes mutations to this
/// record only; cross-job operations never contend on it.
struct JobSlot {
    state: Mutex<Job>,
    done: Notify,
    cancel: CancellationToken,
}

impl JobSlot {
    fn lock_state(&self) -> MutexGuard<'_, Job> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> Job {
        self.lock_state().clone()
    }
}

/// Owner of the job table: submission, polling, resumption, listing,
/// cancellation, and TTL-based purging.
pub struct AsyncJobManager {
    config: JobManagerConfig,
    jobs: RwLock<HashMap<String, Arc<JobSlot>>>,
    events: Option<Arc<dyn EventSink>>,
}

impl AsyncJobManager {
    pub fn new(config: JobManagerConfig) -> Self {
        Self {
            config,
            jobs: RwLock::new(HashMap::new()),
            events: None,
        }
    }

    /// Attach a sink receiving `job.submitted` / `job.completed` /
    /// `job.failed` / `job.cancelled` notifications.
    pub fn with_events(config: JobManagerConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            jobs: RwLock::new(HashMap::new()),
            events: Some(events),
        }
    }

    pub fn config(&self) -> &JobManagerConfig {
        &self.config
    }

    /// Register a job and schedule its executor. Returns the handle
    /// synchronously, before the executor necessarily runs.
    ///
    /// The job is considered started as soon as it is scheduled, so the
    /// stored status moves straight to `in_progress`. Submission is rejected
    /// with [`JobError::CapacityExceeded`] when the table already holds
    /// `max_jobs` non-terminal jobs.
    pub fn submit(
        &self,
        request_id: &str,
        tool_id: &str,
        arguments: Value,
        executor: Arc<dyn JobExecutor>,
    ) -> Result<JobHandle, JobError> {
        let slot = {
            let mut jobs = self.write_table();
            Self::purge_expired(&mut jobs);

            let active = jobs
                .values()
                .filter(|slot| !slot.lock_state().status.is_terminal())
                .count();
            if active >= self.config.max_jobs {
                return Err(JobError::CapacityExceeded {
                    active,
                    limit: self.config.max_jobs,
                });
            }

            let now = Utc::now();
            let job = Job {
                job_id: Uuid::new_v4().to_string(),
                request_id: request_id.to_string(),
                tool_id: tool_id.to_string(),
                status: JobStatus::InProgress,
                progress: 0,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
                ttl_deadline: Self::deadline_from(now, &self.config),
            };
            let slot = Arc::new(JobSlot {
                state: Mutex::new(job),
                done: Notify::new(),
                cancel: CancellationToken::new(),
            });
            jobs.insert(slot.lock_state().job_id.clone(), slot.clone());
            slot
        };

        let handle = {
            let job = slot.lock_state();
            JobHandle {
                request_id: job.request_id.clone(),
                job_id: job.job_id.clone(),
                status: job.status,
                poll_after: self.config.poll_after.as_millis() as u64,
            }
        };

        self.emit(GatewayEvent::JobSubmitted {
            job_id: handle.job_id.clone(),
            tool_id: tool_id.to_string(),
        });

        let progress = ProgressReporter {
            slot: Arc::downgrade(&slot),
        };
        let cancel = slot.cancel.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            // Inner spawn isolates executor panics into a JoinError.
            let outcome =
                tokio::spawn(async move { executor.run(arguments, progress, cancel).await }).await;

            let settled: Result<Value, String> = match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(err.to_string()),
                Err(join) if join.is_panic() => Err("executor panicked".to_string()),
                Err(join) => Err(join.to_string()),
            };

            let event = {
                let mut job = slot.lock_state();
                // A result arriving after cancellation is discarded; the
                // externally visible state already changed.
                if job.status.is_terminal() {
                    tracing::debug!(
                        job_id = %job.job_id,
                        status = %job.status,
                        "discarding late executor result"
                    );
                    return;
                }
                match settled {
                    Ok(value) => {
                        job.status = JobStatus::Completed;
                        job.result = Some(value);
                        job.updated_at = Utc::now();
                        GatewayEvent::JobCompleted {
                            job_id: job.job_id.clone(),
                        }
                    }
                    Err(message) => {
                        job.status = JobStatus::Failed;
                        job.error = Some(message.clone());
                        job.updated_at = Utc::now();
                        GatewayEvent::JobFailed {
                            job_id: job.job_id.clone(),
                            error: message,
                        }
                    }
                }
            };
            slot.done.notify_waiters();
            if let Some(sink) = &events {
                sink.emit(event);
            }
        });

        Ok(handle)
    }

    /// Non-blocking snapshot of the job's current state.
    pub fn poll(&self, job_id: &str) -> Result<Job, JobError> {
        let slot = self.live_slot(job_id)?;
        Ok(slot.snapshot())
    }

    /// Wait for the job to settle, bounded by its remaining TTL.
    ///
    /// Returns immediately on terminal jobs. A job still running when the
    /// wait elapses is coerced into an `error` result describing its last
    /// known state.
    pub async fn resume(&self, job_id: &str) -> Result<JobResult, JobError> {
        let slot = self.live_slot(job_id)?;

        let notified = slot.done.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let remaining = {
            let job = slot.lock_state();
            if job.status.is_terminal() {
                return Ok(Self::to_result(&job));
            }
            (job.ttl_deadline - Utc::now())
                .to_std()
                .unwrap_or_default()
        };

        let _ = tokio::time::timeout(remaining, notified).await;

        let job = slot.lock_state();
        Ok(Self::to_result(&job))
    }

    /// Jobs ordered by creation time, most recent first. `total` reflects the
    /// full count matching the filter, independent of `limit`.
    pub fn list(&self, limit: usize, status: Option<JobStatus>) -> JobListing {
        let mut jobs = self.write_table();
        Self::purge_expired(&mut jobs);

        let mut matching: Vec<Job> = jobs
            .values()
            .map(|slot| slot.snapshot())
            .filter(|job| status.map_or(true, |s| job.status == s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len();
        matching.truncate(limit);
        JobListing {
            jobs: matching,
            total,
        }
    }

    /// Flip a non-terminal job to `cancelled` and signal its executor.
    ///
    /// Returns `false` if the job already settled. The status change is
    /// visible to subsequent polls immediately; the executor may keep running
    /// in the background, but its eventual settlement is discarded.
    pub fn cancel(&self, job_id: &str) -> Result<bool, JobError> {
        let slot = self.live_slot(job_id)?;

        let cancelled = {
            let mut job = slot.lock_state();
            if job.status.is_terminal() {
                false
            } else {
                job.status = JobStatus::Cancelled;
                job.updated_at = Utc::now();
                true
            }
        };

        if cancelled {
            slot.cancel.cancel();
            slot.done.notify_waiters();
            self.emit(GatewayEvent::JobCancelled {
                job_id: job_id.to_string(),
            });
        }
        Ok(cancelled)
    }

    /// Delete a terminal job record without waiting for its TTL.
    ///
    /// Returns `false` (and leaves the record in place) when the job has not
    /// settled yet.
    pub fn remove(&self, job_id: &str) -> Result<bool, JobError> {
        let mut jobs = self.write_table();
        let terminal = jobs
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?
            .lock_state()
            .status
            .is_terminal();
        if terminal {
            jobs.remove(job_id);
        }
        Ok(terminal)
    }

    /// Count of non-terminal jobs currently tracked.
    pub fn active_count(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|slot| !slot.lock_state().status.is_terminal())
            .count()
    }

    /// Fetch a slot, purging it first if its TTL has passed.
    fn live_slot(&self, job_id: &str) -> Result<Arc<JobSlot>, JobError> {
        let mut jobs = self.write_table();
        let slot = jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        if slot.lock_state().ttl_deadline <= Utc::now() {
            jobs.remove(job_id);
            return Err(JobError::NotFound(job_id.to_string()));
        }
        Ok(slot)
    }

    fn write_table(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<JobSlot>>> {
        self.jobs.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn purge_expired(jobs: &mut HashMap<String, Arc<JobSlot>>) {
        let now = Utc::now();
        jobs.retain(|_, slot| slot.lock_state().ttl_deadline > now);
    }

    fn deadline_from(now: DateTime<Utc>, config: &JobManagerConfig) -> DateTime<Utc> {
        chrono::Duration::from_std(config.job_ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn to_result(job: &Job) -> JobResult {
        match job.status {
            JobStatus::Completed => JobResult {
                request_id: job.request_id.clone(),
                status: JobOutcome::Success,
                result: job.result.clone(),
                error: None,
            },
            JobStatus::Failed => JobResult {
                request_id: job.request_id.clone(),
                status: JobOutcome::Error,
                result: None,
                error: job
                    .error
                    .clone()
                    .or_else(|| Some("job failed".to_string())),
            },
            JobStatus::Cancelled => JobResult {
                request_id: job.request_id.clone(),
                status: JobOutcome::Error,
                result: None,
                error: Some("job cancelled".to_string()),
            },
            JobStatus::Queued | JobStatus::InProgress => JobResult {
                request_id: job.request_id.clone(),
                status: JobOutcome::Error,
                result: None,
                error: Some(format!(
                    "job still {} after wait; poll again later",
                    job.status
                )),
            },
        }
    }

    fn emit(&self, event: GatewayEvent) {
        if let Some(sink) = &self.events {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    struct InstantExecutor;

    #[async_trait]
    impl JobExecutor for InstantExecutor {
        async fn run(
            &self,
            arguments: Value,
            _progress: ProgressReporter,
            _cancel: CancellationToken,
        ) -> anyhow::Result<Value> {
            Ok(json!({ "echoed": arguments }))
        }
    }

    struct SteppedExecutor {
        steps: Vec<u8>,
    }

    #[async_trait]
    impl JobExecutor for SteppedExecutor {
        async fn run(
            &self,
            _arguments: Value,
            progress: ProgressReporter,
            _cancel: CancellationToken,
        ) -> anyhow::Result<Value> {
            for step in &self.steps {
                progress.report(*step);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(json!({ "done": true }))
        }
    }

    struct HangingExecutor;

    #[async_trait]
    impl JobExecutor for HangingExecutor {
        async fn run(
            &self,
            _arguments: Value,
            _progress: ProgressReporter,
            cancel: CancellationToken,
        ) -> anyhow::Result<Value> {
            cancel.cancelled().await;
            Ok(json!({ "interrupted": true }))
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl JobExecutor for FailingExecutor {
        async fn run(
            &self,
            _arguments: Value,
            _progress: ProgressReporter,
            _cancel: CancellationToken,
        ) -> anyhow::Result<Value> {
            anyhow::bail!("disk on fire")
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl JobExecutor for PanickingExecutor {
        async fn run(
            &self,
            _arguments: Value,
            _progress: ProgressReporter,
            _cancel: CancellationToken,
        ) -> anyhow::Result<Value> {
            panic!("executor bug")
        }
    }

    fn manager() -> AsyncJobManager {
        AsyncJobManager::new(JobManagerConfig::default())
    }

    #[tokio::test]
    async fn submit_returns_handle_synchronously() {
        let mgr = manager();
        let handle = mgr
            .submit("r1", "echo", json!({"x": 1}), Arc::new(InstantExecutor))
            .unwrap();
        assert_eq!(handle.request_id, "r1");
        assert!(matches!(
            handle.status,
            JobStatus::Queued | JobStatus::InProgress
        ));
        assert!(handle.poll_after > 0);
    }

    #[tokio::test]
    async fn poll_right_after_submit_sees_the_job() {
        let mgr = manager();
        let handle = mgr
            .submit("r1", "echo", json!({}), Arc::new(InstantExecutor))
            .unwrap();
        let job = mgr.poll(&handle.job_id).unwrap();
        assert_eq!(job.job_id, handle.job_id);
        assert_eq!(job.tool_id, "echo");
    }

    #[tokio::test]
    async fn resume_returns_executor_result() {
        let mgr = manager();
        let handle = mgr
            .submit("r1", "echo", json!({"k": "v"}), Arc::new(InstantExecutor))
            .unwrap();
        let result = mgr.resume(&handle.job_id).await.unwrap();
        assert_eq!(result.status, JobOutcome::Success);
        assert_eq!(result.result, Some(json!({ "echoed": { "k": "v" } })));
    }

    #[tokio::test]
    async fn progress_sequence_lands_in_final_snapshot() {
        let mgr = manager();
        let handle = mgr
            .submit(
                "r1",
                "stepper",
                json!({}),
                Arc::new(SteppedExecutor {
                    steps: vec![0, 25, 50, 75, 100],
                }),
            )
            .unwrap();
        let result = mgr.resume(&handle.job_id).await.unwrap();
        assert_eq!(result.status, JobOutcome::Success);

        let job = mgr.poll(&handle.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result, Some(json!({ "done": true })));
    }

    #[tokio::test]
    async fn cancel_flips_status_and_signals_executor() {
        let mgr = manager();
        let handle = mgr
            .submit("r1", "hang", json!({}), Arc::new(HangingExecutor))
            .unwrap();
        assert!(mgr.cancel(&handle.job_id).unwrap());

        let job = mgr.poll(&handle.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);

        // Late executor settlement must not overwrite the cancellation.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let job = mgr.poll(&handle.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.result.is_none());

        // Second cancel is a no-op on a terminal job.
        assert!(!mgr.cancel(&handle.job_id).unwrap());
    }

    #[tokio::test]
    async fn failing_executor_is_contained() {
        let mgr = manager();
        let handle = mgr
            .submit("r1", "boom", json!({}), Arc::new(FailingExecutor))
            .unwrap();
        let result = mgr.resume(&handle.job_id).await.unwrap();
        assert_eq!(result.status, JobOutcome::Error);
        assert_eq!(result.error.as_deref(), Some("disk on fire"));

        let job = mgr.poll(&handle.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn panicking_executor_marks_job_failed_and_manager_survives() {
        let mgr = manager();
        let handle = mgr
            .submit("r1", "panic", json!({}), Arc::new(PanickingExecutor))
            .unwrap();
        let result = mgr.resume(&handle.job_id).await.unwrap();
        assert_eq!(result.status, JobOutcome::Error);
        assert_eq!(result.error.as_deref(), Some("executor panicked"));

        // Other jobs keep working.
        let handle2 = mgr
            .submit("r2", "echo", json!({}), Arc::new(InstantExecutor))
            .unwrap();
        let result2 = mgr.resume(&handle2.job_id).await.unwrap();
        assert_eq!(result2.status, JobOutcome::Success);
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let mgr = AsyncJobManager::new(JobManagerConfig {
            max_jobs: 2,
            ..JobManagerConfig::default()
        });
        mgr.submit("r1", "hang", json!({}), Arc::new(HangingExecutor))
            .unwrap();
        mgr.submit("r2", "hang", json!({}), Arc::new(HangingExecutor))
            .unwrap();
        let err = mgr
            .submit("r3", "hang", json!({}), Arc::new(HangingExecutor))
            .unwrap_err();
        assert!(matches!(err, JobError::CapacityExceeded { active: 2, limit: 2 }));
        assert_eq!(mgr.active_count(), 2);
    }

    #[tokio::test]
    async fn terminal_jobs_do_not_count_against_capacity() {
        let mgr = AsyncJobManager::new(JobManagerConfig {
            max_jobs: 1,
            ..JobManagerConfig::default()
        });
        let handle = mgr
            .submit("r1", "echo", json!({}), Arc::new(InstantExecutor))
            .unwrap();
        mgr.resume(&handle.job_id).await.unwrap();
        // First job settled; the slot is free again.
        mgr.submit("r2", "echo", json!({}), Arc::new(InstantExecutor))
            .unwrap();
    }

    #[tokio::test]
    async fn expired_jobs_are_unreachable() {
        let mgr = AsyncJobManager::new(JobManagerConfig {
            job_ttl: Duration::from_millis(20),
            ..JobManagerConfig::default()
        });
        let handle = mgr
            .submit("r1", "echo", json!({}), Arc::new(InstantExecutor))
            .unwrap();
        mgr.resume(&handle.job_id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(matches!(
            mgr.poll(&handle.job_id),
            Err(JobError::NotFound(_))
        ));
        let listing = mgr.list(10, None);
        assert_eq!(listing.total, 0);
    }

    #[tokio::test]
    async fn resume_on_stuck_job_is_bounded_by_ttl() {
        let mgr = AsyncJobManager::new(JobManagerConfig {
            job_ttl: Duration::from_millis(50),
            ..JobManagerConfig::default()
        });
        let handle = mgr
            .submit("r1", "hang", json!({}), Arc::new(HangingExecutor))
            .unwrap();
        let result = mgr.resume(&handle.job_id).await.unwrap();
        assert_eq!(result.status, JobOutcome::Error);
        assert!(result.error.unwrap().contains("in_progress"));
    }

    #[tokio::test]
    async fn list_orders_most_recent_first_and_reports_total() {
        let mgr = manager();
        for i in 0..5 {
            mgr.submit(
                &format!("r{i}"),
                "hang",
                json!({}),
                Arc::new(HangingExecutor),
            )
            .unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let listing = mgr.list(3, None);
        assert_eq!(listing.total, 5);
        assert_eq!(listing.jobs.len(), 3);
        assert_eq!(listing.jobs[0].request_id, "r4");
        assert!(listing
            .jobs
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));

        let in_progress = mgr.list(10, Some(JobStatus::InProgress));
        assert_eq!(in_progress.total, 5);
    }

    #[tokio::test]
    async fn unknown_job_id_raises_not_found() {
        let mgr = manager();
        assert!(matches!(mgr.poll("nope"), Err(JobError::NotFound(_))));
        assert!(matches!(mgr.cancel("nope"), Err(JobError::NotFound(_))));
        assert!(matches!(
            mgr.resume("nope").await,
            Err(JobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_deletes_only_terminal_jobs() {
        let mgr = manager();
        let done = mgr
            .submit("r1", "echo", json!({}), Arc::new(InstantExecutor))
            .unwrap();
        mgr.resume(&done.job_id).await.unwrap();
        assert!(mgr.remove(&done.job_id).unwrap());
        assert!(matches!(mgr.poll(&done.job_id), Err(JobError::NotFound(_))));

        let running = mgr
            .submit("r2", "hang", json!({}), Arc::new(HangingExecutor))
            .unwrap();
        assert!(!mgr.remove(&running.job_id).unwrap());
        assert!(mgr.poll(&running.job_id).is_ok());
    }
}
