//! In-memory priority queue with a fixed worker pool.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::dispatch::job::{EnqueueRequest, JobSnapshot, JobState, MessageJob, QueueMetrics, QueuedJob};
use crate::dispatch::worker;
use crate::error::{DispatchError, DispatchResult};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::provider::{CredentialStore, MessagingApi};
use crate::rate_limit::RateLimiter;
use crate::resilience::ErrorClassifier;
use crate::telemetry::{now_ms, TelemetryAggregator};

/// Collaborators the workers call into.
#[derive(Clone)]
pub struct QueueComponents {
    pub limiter: Arc<RateLimiter>,
    pub classifier: Arc<ErrorClassifier>,
    pub telemetry: Arc<TelemetryAggregator>,
    pub api: Arc<dyn MessagingApi>,
    pub credentials: Arc<dyn CredentialStore>,
}

#[derive(Default)]
struct QueueState {
    heap: BinaryHeap<QueuedJob>,
    jobs: HashMap<String, JobSnapshot>,
    finished: VecDeque<String>,
    delayed: usize,
    active: usize,
    completed: u64,
    failed: u64,
    sequence: u64,
    paused: bool,
    closed: bool,
}

impl QueueState {
    fn push(&mut self, job: MessageJob) {
        let sequence = self.sequence;
        self.sequence += 1;
        self.heap.push(QueuedJob { sequence, job });
    }

    fn waiting(&self) -> usize {
        self.heap.len() + self.delayed
    }
}

/// State shared between the queue handle, its workers and retry timers.
pub(crate) struct QueueShared {
    state: Mutex<QueueState>,
    notify: Notify,
    pub(crate) components: QueueComponents,
    pub(crate) max_attempts: u32,
    retention: usize,
    shutdown: Shutdown,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

/// How a processed job leaves the worker.
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed { message_id: Option<String> },
    Failed { error: String },
    Retry { delay: Duration, action: &'static str },
}

impl QueueShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().expect("dispatch queue lock poisoned")
    }

    /// Wait for the next runnable job. `None` once the queue is closed.
    pub(crate) async fn next_job(&self) -> Option<MessageJob> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if !state.paused {
                    if let Some(QueuedJob { mut job, .. }) = state.heap.pop() {
                        job.attempts += 1;
                        state.active += 1;
                        if let Some(snapshot) = state.jobs.get_mut(&job.id) {
                            snapshot.state = JobState::Active;
                            snapshot.attempts = job.attempts;
                        }
                        let more = !state.heap.is_empty();
                        metrics::record_queue_depth(state.waiting());
                        drop(state);
                        if more {
                            self.notify.notify_one();
                        }
                        return Some(job);
                    }
                }
            }

            notified.await;
        }
    }

    /// Apply a worker's outcome to the job.
    pub(crate) fn settle(self: &Arc<Self>, job: MessageJob, outcome: Outcome) {
        match outcome {
            Outcome::Completed { message_id } => {
                tracing::info!(
                    job_id = %job.id,
                    tenant_id = %job.tenant_id,
                    attempts = job.attempts,
                    message_id = ?message_id,
                    "Job completed"
                );
                self.finish(&job, JobState::Completed, message_id, None);
            }
            Outcome::Failed { error } => {
                tracing::warn!(
                    job_id = %job.id,
                    tenant_id = %job.tenant_id,
                    attempts = job.attempts,
                    error = %error,
                    "Job failed"
                );
                self.finish(&job, JobState::Failed, None, Some(error));
            }
            Outcome::Retry { delay, action } => {
                tracing::debug!(
                    job_id = %job.id,
                    attempts = job.attempts,
                    delay_ms = delay.as_millis() as u64,
                    action,
                    "Retrying job"
                );
                metrics::record_job_retry(action);
                self.requeue(job, delay);
            }
        }
    }

    fn finish(&self, job: &MessageJob, state_to: JobState, message_id: Option<String>, error: Option<String>) {
        self.components.classifier.reset_retries(&job.id);

        let mut state = self.lock();
        state.active = state.active.saturating_sub(1);
        match state_to {
            JobState::Completed => state.completed += 1,
            _ => state.failed += 1,
        }
        if let Some(snapshot) = state.jobs.get_mut(&job.id) {
            snapshot.state = state_to;
            snapshot.attempts = job.attempts;
            snapshot.finished_at = Some(now_ms());
            snapshot.message_id = message_id;
            snapshot.error = error;
        }
        state.finished.push_back(job.id.clone());
        while state.finished.len() > self.retention {
            if let Some(evicted) = state.finished.pop_front() {
                state.jobs.remove(&evicted);
            }
        }
        drop(state);

        metrics::record_job_finished(if state_to == JobState::Completed {
            "completed"
        } else {
            "failed"
        });
    }

    fn requeue(self: &Arc<Self>, job: MessageJob, delay: Duration) {
        let mut state = self.lock();
        state.active = state.active.saturating_sub(1);
        if let Some(snapshot) = state.jobs.get_mut(&job.id) {
            snapshot.state = JobState::Waiting;
        }

        if delay.is_zero() {
            state.push(job);
            drop(state);
            self.notify.notify_one();
            return;
        }

        state.delayed += 1;
        drop(state);

        let shared = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let mut state = shared.lock();
                    state.delayed = state.delayed.saturating_sub(1);
                    state.push(job);
                    drop(state);
                    shared.notify.notify_one();
                }
                _ = shared.shutdown.wait() => {
                    shared.components.classifier.reset_retries(&job.id);
                    let mut state = shared.lock();
                    state.delayed = state.delayed.saturating_sub(1);
                    state.jobs.remove(&job.id);
                    tracing::debug!(job_id = %job.id, "Delayed retry cancelled by shutdown");
                }
            }
        });

        let mut timers = self.timers.lock().expect("retry timer lock poisoned");
        timers.retain(|handle| !handle.is_finished());
        timers.push(timer);
    }
}

/// Handle to the dispatch queue. Cheap to clone.
#[derive(Clone)]
pub struct DispatchQueue {
    shared: Arc<QueueShared>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DispatchQueue {
    pub fn new(config: &WorkerConfig, components: QueueComponents) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                components,
                max_attempts: config.max_attempts.max(1),
                retention: config.finished_job_retention,
                shutdown: Shutdown::new(),
                timers: Mutex::new(Vec::new()),
            }),
            workers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Accept a job and return its id. Never waits for processing.
    pub fn enqueue(&self, request: EnqueueRequest, priority: i32) -> DispatchResult<String> {
        if request.tenant_id.trim().is_empty() {
            return Err(DispatchError::InvalidRequest("tenantId must not be empty".into()));
        }
        if request.recipient.trim().is_empty() {
            return Err(DispatchError::InvalidRequest("recipient must not be empty".into()));
        }

        let job = MessageJob::new(request, priority);
        let job_id = job.id.clone();
        {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(DispatchError::QueueClosed);
            }
            state.jobs.insert(job_id.clone(), JobSnapshot::waiting(&job));
            tracing::debug!(
                job_id = %job_id,
                tenant_id = %job.tenant_id,
                message_type = %job.message.message_type,
                priority,
                "Job enqueued"
            );
            state.push(job);
            metrics::record_queue_depth(state.waiting());
        }
        metrics::record_job_enqueued();
        self.shared.notify.notify_one();
        Ok(job_id)
    }

    /// Start `concurrency` worker loops.
    pub fn initialize_workers(&self, concurrency: usize) -> DispatchResult<()> {
        if self.shared.lock().closed {
            return Err(DispatchError::QueueClosed);
        }
        let mut workers = self.workers.lock().expect("worker list lock poisoned");
        let first = workers.len();
        for worker_id in first..first + concurrency {
            let shared = Arc::clone(&self.shared);
            workers.push(tokio::spawn(worker::run(shared, worker_id)));
        }
        tracing::info!(concurrency, total_workers = workers.len(), "Dispatch workers started");
        Ok(())
    }

    /// Job counts by state.
    pub fn metrics(&self) -> QueueMetrics {
        let state = self.shared.lock();
        QueueMetrics {
            waiting: state.waiting(),
            active: state.active,
            completed: state.completed,
            failed: state.failed,
        }
    }

    /// Current view of a job, while it is live or retained.
    pub fn job(&self, job_id: &str) -> Option<JobSnapshot> {
        self.shared.lock().jobs.get(job_id).cloned()
    }

    /// Stop handing jobs to workers. In-flight jobs continue.
    pub fn pause(&self) {
        self.shared.lock().paused = true;
        tracing::info!("Dispatch queue paused");
    }

    pub fn resume(&self) {
        self.shared.lock().paused = false;
        self.shared.notify.notify_waiters();
        tracing::info!("Dispatch queue resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Stop the pool: reject new jobs, cancel delayed retries, wait for
    /// in-flight jobs, then drop whatever is still waiting.
    pub async fn close(&self) {
        {
            let mut state = self.shared.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.shared.shutdown.trigger();
        self.shared.notify.notify_waiters();

        let handles: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .expect("worker list lock poisoned")
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Dispatch worker panicked");
            }
        }

        // Workers are gone, so no new timers can be spawned.
        let timers: Vec<JoinHandle<()>> = self
            .shared
            .timers
            .lock()
            .expect("retry timer lock poisoned")
            .drain(..)
            .collect();
        for timer in timers {
            let _ = timer.await;
        }

        let drained: Vec<QueuedJob> = {
            let mut state = self.shared.lock();
            let drained: Vec<QueuedJob> = state.heap.drain().collect();
            for queued in &drained {
                state.jobs.remove(&queued.job.id);
            }
            drained
        };
        for queued in &drained {
            self.shared.components.classifier.reset_retries(&queued.job.id);
        }
        let dropped = drained.len();
        metrics::record_queue_depth(0);
        tracing::info!(dropped_jobs = dropped, "Dispatch queue closed");
    }
}
