//! Job dispatch queue and worker pool.
//!
//! # Data Flow
//! ```text
//! enqueue(EnqueueRequest) → priority heap → worker
//!     worker: limiter clearance → payload → credentials → provider call
//!             → CallMetric → 2xx: completed
//!                          → non-2xx: classifier → retry (delayed/immediate)
//!                                                → failed (user message)
//! ```
//!
//! # Design Decisions
//! - The job id is the classifier operation id for the job's whole life and
//!   its retry counter is cleared at the terminal state
//! - A hard attempt ceiling applies on top of the classifier's own limits
//! - Delayed retries are timer tasks cancelled by the queue's shutdown signal
//! - State lives in memory only

pub mod job;
pub mod queue;
mod worker;

pub use job::{EnqueueRequest, JobSnapshot, JobState, MessageJob, QueueMetrics};
pub use queue::{DispatchQueue, QueueComponents};
