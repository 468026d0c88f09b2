//! Approval state machine
//!
//! One lifecycle for both subject kinds: a pending observation or batch is
//! approved or rejected exactly once. The engine operates on the
//! ReviewSubject capability only, never on subject-specific fields, and
//! always appends the audit entry before touching the status so no status
//! ever changes without a logged decision.

use crate::db;
use crate::services::with_write_timeout;
use rostra_common::events::{EventBus, RostraEvent};
use rostra_common::models::{
    Identity, ReviewDecision, ReviewEntry, ReviewStatus, SubjectRef,
};
use rostra_common::{db::settings, Error};
use sqlx::SqlitePool;
use std::time::Duration;
use uuid::Uuid;

/// Default per-write timeout in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Review failure taxonomy.
///
/// The variants after the entry write are deliberately distinguishable from
/// the ones before it, so operators are never told to retry a decision that
/// already has a logged comment.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// A rejection must carry a non-empty comment; nothing was written
    #[error("a comment is required when rejecting")]
    CommentRequired,

    #[error("{subject} not found")]
    NotFound { subject: SubjectRef },

    /// Subject was not pending at decision time; nothing was written
    #[error("{subject} is not pending (current status: {current})")]
    Conflict {
        subject: SubjectRef,
        current: ReviewStatus,
        /// Decision already on file, when the audit log has one
        last_decision: Option<ReviewDecision>,
    },

    /// Status read failed before any write
    #[error("failed to read {subject}: {source}")]
    Store {
        subject: SubjectRef,
        #[source]
        source: Error,
    },

    /// The audit append failed; no status change happened
    #[error("failed to append review entry for {subject}: {source}")]
    EntryWrite {
        subject: SubjectRef,
        #[source]
        source: Error,
    },

    /// The decision is logged but the status did not move — either a store
    /// failure after the append, or a racing reviewer won the transition
    #[error("decision {entry_id} for {subject} was logged but the status update did not apply")]
    DecisionLoggedStatusUnchanged { subject: SubjectRef, entry_id: Uuid },
}

/// Capability the state machine needs from a reviewable record kind
pub(crate) trait ReviewSubject {
    fn subject_ref(&self) -> SubjectRef;

    fn current_status(
        &self,
    ) -> impl std::future::Future<Output = rostra_common::Result<Option<ReviewStatus>>> + Send;

    /// Compare-and-set transition out of `pending`; false when the subject
    /// no longer matched
    fn set_status_if_pending(
        &self,
        status: ReviewStatus,
    ) -> impl std::future::Future<Output = rostra_common::Result<bool>> + Send;
}

struct ObservationSubject {
    pool: SqlitePool,
    id: Uuid,
}

impl ReviewSubject for ObservationSubject {
    fn subject_ref(&self) -> SubjectRef {
        SubjectRef::Observation(self.id)
    }

    async fn current_status(&self) -> rostra_common::Result<Option<ReviewStatus>> {
        db::observations::get_status(&self.pool, self.id).await
    }

    async fn set_status_if_pending(&self, status: ReviewStatus) -> rostra_common::Result<bool> {
        db::observations::update_status_if_pending(&self.pool, self.id, status).await
    }
}

struct BatchSubject {
    pool: SqlitePool,
    id: Uuid,
}

impl ReviewSubject for BatchSubject {
    fn subject_ref(&self) -> SubjectRef {
        SubjectRef::Batch(self.id)
    }

    async fn current_status(&self) -> rostra_common::Result<Option<ReviewStatus>> {
        db::batches::get_status(&self.pool, self.id).await
    }

    async fn set_status_if_pending(&self, status: ReviewStatus) -> rostra_common::Result<bool> {
        db::batches::update_status_if_pending(&self.pool, self.id, status).await
    }
}

/// The shared approval engine
pub struct ReviewEngine {
    pool: SqlitePool,
    event_bus: EventBus,
    write_timeout: Duration,
}

impl ReviewEngine {
    pub fn new(pool: SqlitePool, event_bus: EventBus) -> Self {
        Self {
            pool,
            event_bus,
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        }
    }

    /// Build an engine with the write timeout from settings
    pub async fn from_settings(pool: SqlitePool, event_bus: EventBus) -> rostra_common::Result<Self> {
        let timeout_ms = settings::get_i64_setting(
            &pool,
            "ir_write_timeout_ms",
            DEFAULT_WRITE_TIMEOUT_MS as i64,
        )
        .await?;

        Ok(Self {
            pool,
            event_bus,
            write_timeout: Duration::from_millis(timeout_ms as u64),
        })
    }

    /// Apply a reviewer decision to a pending subject.
    ///
    /// Write order is fixed: (1) append the audit entry, (2) compare-and-set
    /// the subject's status. A failure between the two surfaces as
    /// [`ReviewError::DecisionLoggedStatusUnchanged`].
    pub async fn review(
        &self,
        subject: SubjectRef,
        decision: ReviewDecision,
        comment: Option<String>,
        reviewer: &Identity,
    ) -> Result<ReviewEntry, ReviewError> {
        match subject {
            SubjectRef::Observation(id) => {
                let subject = ObservationSubject {
                    pool: self.pool.clone(),
                    id,
                };
                self.apply(subject, decision, comment, reviewer).await
            }
            SubjectRef::Batch(id) => {
                let subject = BatchSubject {
                    pool: self.pool.clone(),
                    id,
                };
                self.apply(subject, decision, comment, reviewer).await
            }
        }
    }

    pub(crate) async fn apply<S: ReviewSubject>(
        &self,
        subject: S,
        decision: ReviewDecision,
        comment: Option<String>,
        reviewer: &Identity,
    ) -> Result<ReviewEntry, ReviewError> {
        let sref = subject.subject_ref();

        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if decision == ReviewDecision::Rejected && comment.is_none() {
            return Err(ReviewError::CommentRequired);
        }

        let current = subject
            .current_status()
            .await
            .map_err(|source| ReviewError::Store {
                subject: sref,
                source,
            })?
            .ok_or(ReviewError::NotFound { subject: sref })?;

        if !current.is_reviewable() {
            let last_decision = db::reviews::latest_for_subject(&self.pool, sref)
                .await
                .ok()
                .flatten()
                .map(|entry| entry.decision);

            return Err(ReviewError::Conflict {
                subject: sref,
                current,
                last_decision,
            });
        }

        let entry = ReviewEntry::new(
            sref,
            reviewer.user_id,
            reviewer.email.clone(),
            decision,
            comment,
        );

        with_write_timeout(
            self.write_timeout,
            db::reviews::insert_entry(&self.pool, &entry),
        )
        .await
        .map_err(|source| ReviewError::EntryWrite {
            subject: sref,
            source,
        })?;

        let moved = with_write_timeout(
            self.write_timeout,
            subject.set_status_if_pending(decision.resulting_status()),
        )
        .await
        .unwrap_or(false);

        if !moved {
            tracing::warn!(
                subject = %sref,
                entry_id = %entry.id,
                "Review entry logged but status update did not apply"
            );
            return Err(ReviewError::DecisionLoggedStatusUnchanged {
                subject: sref,
                entry_id: entry.id,
            });
        }

        tracing::info!(
            subject = %sref,
            decision = %decision,
            reviewer = %reviewer.email,
            "Review recorded"
        );

        self.event_bus.emit(RostraEvent::ReviewRecorded {
            subject: sref,
            decision,
            reviewer_email: reviewer.email.clone(),
            timestamp: chrono::Utc::now(),
        });

        Ok(entry)
    }
}
