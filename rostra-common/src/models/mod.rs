//! Domain models shared by the Rostra services

mod batch;
mod category;
mod observation;
mod review;
mod status;

pub use batch::{BulkBatch, BulkRecord};
pub use category::TagCategory;
pub use observation::{EvidenceType, FieldObserved, NewObservation, Observation};
pub use review::{ReviewEntry, SubjectRef};
pub use status::{IngestState, ReviewDecision, ReviewStatus};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operator identity at the time of a write.
///
/// Issued by the external authentication collaborator and passed explicitly
/// into every core operation so nothing reads ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

impl Identity {
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}
