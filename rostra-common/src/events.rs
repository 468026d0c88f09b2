//! Event types for the Rostra event system
//!
//! Provides shared event definitions and the EventBus used to broadcast
//! submission progress and review decisions to SSE clients.

use crate::models::{ReviewDecision, SubjectRef};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Rostra event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RostraEvent {
    /// A new observation entered the review queue
    ObservationSubmitted {
        observation_id: Uuid,
        provider_npi: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Batch row created; chunk writes are about to start
    BatchSubmissionStarted {
        batch_id: Uuid,
        record_count: usize,
        total_chunks: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One chunk acknowledged by the store
    ///
    /// `percent` is cumulative and non-decreasing; it reaches 100 only
    /// after the final chunk commits.
    BatchChunkCommitted {
        batch_id: Uuid,
        /// Zero-based index of the chunk that just committed
        chunk_index: usize,
        total_chunks: usize,
        rows_written: usize,
        percent: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every declared row is persisted
    BatchSubmissionCompleted {
        batch_id: Uuid,
        record_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A chunk write failed; the batch is left partially ingested
    BatchSubmissionFailed {
        batch_id: Uuid,
        chunk_index: usize,
        rows_written: usize,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A partially ingested batch is being resumed from its cursor
    BatchResumeStarted {
        batch_id: Uuid,
        resume_from_chunk: usize,
        total_chunks: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A review decision was logged and the subject transitioned
    ReviewRecorded {
        subject: SubjectRef,
        decision: ReviewDecision,
        reviewer_email: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RostraEvent {
    /// Event type name used as the SSE event field
    pub fn event_type(&self) -> &str {
        match self {
            RostraEvent::ObservationSubmitted { .. } => "ObservationSubmitted",
            RostraEvent::BatchSubmissionStarted { .. } => "BatchSubmissionStarted",
            RostraEvent::BatchChunkCommitted { .. } => "BatchChunkCommitted",
            RostraEvent::BatchSubmissionCompleted { .. } => "BatchSubmissionCompleted",
            RostraEvent::BatchSubmissionFailed { .. } => "BatchSubmissionFailed",
            RostraEvent::BatchResumeStarted { .. } => "BatchResumeStarted",
            RostraEvent::ReviewRecorded { .. } => "ReviewRecorded",
        }
    }
}

/// Broadcast bus for RostraEvent
///
/// Thin wrapper over `tokio::sync::broadcast` so emitters never fail when
/// no SSE client is connected.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RostraEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<RostraEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers; returns the receiver count.
    /// An event with no listeners is dropped, not an error.
    pub fn emit(&self, event: RostraEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}
