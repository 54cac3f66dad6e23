//! Job records and snapshots.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::provider::payload::OutboundMessage;
use crate::telemetry::now_ms;

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// A send request as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub tenant_id: String,
    pub recipient: String,
    pub message: OutboundMessage,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl EnqueueRequest {
    pub fn new(tenant_id: impl Into<String>, recipient: impl Into<String>, message: OutboundMessage) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            recipient: recipient.into(),
            message,
            metadata: HashMap::new(),
        }
    }
}

/// A job owned by the queue.
#[derive(Debug, Clone)]
pub struct MessageJob {
    pub id: String,
    pub tenant_id: String,
    pub recipient: String,
    pub message: OutboundMessage,
    pub metadata: HashMap<String, Value>,
    /// Processing attempts started so far; only the worker increments it.
    pub attempts: u32,
    pub priority: i32,
    pub created_at: u64,
}

impl MessageJob {
    pub fn new(request: EnqueueRequest, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: request.tenant_id,
            recipient: request.recipient,
            message: request.message,
            metadata: request.metadata,
            attempts: 0,
            priority,
            created_at: now_ms(),
        }
    }
}

/// Point-in-time view of a job for status lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub tenant_id: String,
    pub recipient: String,
    pub message_type: String,
    pub state: JobState,
    pub attempts: u32,
    pub priority: i32,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
    /// Provider message id of a completed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// User-facing error of a failed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobSnapshot {
    pub(crate) fn waiting(job: &MessageJob) -> Self {
        Self {
            id: job.id.clone(),
            tenant_id: job.tenant_id.clone(),
            recipient: job.recipient.clone(),
            message_type: job.message.message_type.clone(),
            state: JobState::Waiting,
            attempts: job.attempts,
            priority: job.priority,
            created_at: job.created_at,
            finished_at: None,
            message_id: None,
            error: None,
        }
    }
}

/// Job counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueMetrics {
    pub waiting: usize,
    pub active: usize,
    pub completed: u64,
    pub failed: u64,
}

/// Heap entry: higher priority first, FIFO among equal priority.
#[derive(Debug)]
pub(crate) struct QueuedJob {
    pub(crate) sequence: u64,
    pub(crate) job: MessageJob,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for QueuedJob {}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.job
            .priority
            .cmp(&other.job.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
