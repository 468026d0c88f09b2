//! Review lifecycle and ingestion state enumerations

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review lifecycle shared by observations and bulk batches.
///
/// `pending` is the only state the review workflow may leave; `applied` is
/// reached by an external process and is never written by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Applied,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Applied => "applied",
        }
    }

    /// A subject that has left `pending` is review-immutable
    pub fn is_reviewable(&self) -> bool {
        matches!(self, ReviewStatus::Pending)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            "applied" => Ok(ReviewStatus::Applied),
            other => Err(Error::Internal(format!("unknown review status: {other}"))),
        }
    }
}

/// Reviewer verdict recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }

    /// The status a subject moves to when this decision is confirmed
    pub fn resulting_status(&self) -> ReviewStatus {
        match self {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::Rejected => ReviewStatus::Rejected,
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewDecision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "approved" => Ok(ReviewDecision::Approved),
            "rejected" => Ok(ReviewDecision::Rejected),
            other => Err(Error::Internal(format!("unknown review decision: {other}"))),
        }
    }
}

/// Durable ingestion state of a bulk batch.
///
/// Persisted separately from the review status so a submission interrupted
/// between chunks is observable and resumable rather than a silent
/// record-count mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    /// Batch row exists; chunk writes are in flight
    Ingesting,
    /// Every declared row is persisted
    Ingested,
    /// A chunk write failed; persisted rows stop at the last committed chunk
    PartiallyIngested,
}

impl IngestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestState::Ingesting => "ingesting",
            IngestState::Ingested => "ingested",
            IngestState::PartiallyIngested => "partially_ingested",
        }
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "ingesting" => Ok(IngestState::Ingesting),
            "ingested" => Ok(IngestState::Ingested),
            "partially_ingested" => Ok(IngestState::PartiallyIngested),
            other => Err(Error::Internal(format!("unknown ingest state: {other}"))),
        }
    }
}
