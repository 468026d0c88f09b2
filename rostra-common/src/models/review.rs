//! Review audit entries and the polymorphic subject reference

use crate::models::ReviewDecision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reference to exactly one reviewable subject kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectRef {
    Observation(Uuid),
    Batch(Uuid),
}

impl SubjectRef {
    pub fn kind(&self) -> &'static str {
        match self {
            SubjectRef::Observation(_) => "observation",
            SubjectRef::Batch(_) => "batch",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            SubjectRef::Observation(id) | SubjectRef::Batch(id) => *id,
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Append-only audit fact: one review decision on one subject.
///
/// The subject link is structural (nullable column per kind, exactly one
/// set) rather than encoded in the comment text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub id: Uuid,
    pub observation_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub reviewer_id: Uuid,
    pub reviewer_email: String,
    pub decision: ReviewDecision,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReviewEntry {
    /// Build an entry for `subject`; exactly one foreign key is populated
    pub fn new(
        subject: SubjectRef,
        reviewer_id: Uuid,
        reviewer_email: String,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Self {
        let (observation_id, batch_id) = match subject {
            SubjectRef::Observation(id) => (Some(id), None),
            SubjectRef::Batch(id) => (None, Some(id)),
        };
        Self {
            id: Uuid::new_v4(),
            observation_id,
            batch_id,
            reviewer_id,
            reviewer_email,
            decision,
            comment,
            created_at: Utc::now(),
        }
    }

    pub fn subject(&self) -> Option<SubjectRef> {
        match (self.observation_id, self.batch_id) {
            (Some(id), None) => Some(SubjectRef::Observation(id)),
            (None, Some(id)) => Some(SubjectRef::Batch(id)),
            _ => None,
        }
    }
}
