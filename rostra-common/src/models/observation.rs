//! Single-record discrepancy observations

use crate::models::ReviewStatus;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Enrollment field the discrepancy was observed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldObserved {
    TermDate,
    EffectiveDate,
    CredentialingStatus,
    EnrollmentStatus,
    TaxId,
    PayerId,
    GroupBillingId,
    Other,
}

impl FieldObserved {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldObserved::TermDate => "term_date",
            FieldObserved::EffectiveDate => "effective_date",
            FieldObserved::CredentialingStatus => "credentialing_status",
            FieldObserved::EnrollmentStatus => "enrollment_status",
            FieldObserved::TaxId => "tax_id",
            FieldObserved::PayerId => "payer_id",
            FieldObserved::GroupBillingId => "group_billing_id",
            FieldObserved::Other => "other",
        }
    }
}

impl fmt::Display for FieldObserved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldObserved {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "term_date" => Ok(FieldObserved::TermDate),
            "effective_date" => Ok(FieldObserved::EffectiveDate),
            "credentialing_status" => Ok(FieldObserved::CredentialingStatus),
            "enrollment_status" => Ok(FieldObserved::EnrollmentStatus),
            "tax_id" => Ok(FieldObserved::TaxId),
            "payer_id" => Ok(FieldObserved::PayerId),
            "group_billing_id" => Ok(FieldObserved::GroupBillingId),
            "other" => Ok(FieldObserved::Other),
            other => Err(Error::Internal(format!("unknown observed field: {other}"))),
        }
    }
}

/// How the corrected value was verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Email,
    PhoneCall,
    PayerPortal,
    Letter,
    InternalRecord,
    Other,
}

impl EvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::Email => "email",
            EvidenceType::PhoneCall => "phone_call",
            EvidenceType::PayerPortal => "payer_portal",
            EvidenceType::Letter => "letter",
            EvidenceType::InternalRecord => "internal_record",
            EvidenceType::Other => "other",
        }
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "email" => Ok(EvidenceType::Email),
            "phone_call" => Ok(EvidenceType::PhoneCall),
            "payer_portal" => Ok(EvidenceType::PayerPortal),
            "letter" => Ok(EvidenceType::Letter),
            "internal_record" => Ok(EvidenceType::InternalRecord),
            "other" => Ok(EvidenceType::Other),
            other => Err(Error::Internal(format!("unknown evidence type: {other}"))),
        }
    }
}

/// A reported provider-enrollment discrepancy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub provider_npi: String,
    pub provider_name: String,
    pub payer_name: Option<String>,
    pub field_observed: FieldObserved,
    /// Paired source-system snapshots, when the analyst captured them
    pub system_a_name: Option<String>,
    pub system_a_value: Option<String>,
    pub system_b_name: Option<String>,
    pub system_b_value: Option<String>,
    pub corrected_value: String,
    pub evidence_type: EvidenceType,
    pub evidence_notes: Option<String>,
    pub submitted_by: Uuid,
    pub submitted_by_email: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

/// Submission payload for a new observation, validated before any store write
#[derive(Debug, Clone, Deserialize)]
pub struct NewObservation {
    pub provider_npi: String,
    pub provider_name: String,
    #[serde(default)]
    pub payer_name: Option<String>,
    pub field_observed: FieldObserved,
    #[serde(default)]
    pub system_a_name: Option<String>,
    #[serde(default)]
    pub system_a_value: Option<String>,
    #[serde(default)]
    pub system_b_name: Option<String>,
    #[serde(default)]
    pub system_b_value: Option<String>,
    pub corrected_value: String,
    pub evidence_type: EvidenceType,
    #[serde(default)]
    pub evidence_notes: Option<String>,
}

impl NewObservation {
    /// Validate submitter input. NPIs are exactly ten digits; the provider
    /// name and corrected value must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.provider_npi.len() != 10 || !self.provider_npi.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::InvalidInput(
                "provider_npi must be exactly 10 digits".to_string(),
            ));
        }
        if self.provider_name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "provider_name must not be empty".to_string(),
            ));
        }
        if self.corrected_value.trim().is_empty() {
            return Err(Error::InvalidInput(
                "corrected_value must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Materialize a pending observation owned by `submitter`
    pub fn into_observation(self, submitter_id: Uuid, submitter_email: String) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            provider_npi: self.provider_npi,
            provider_name: self.provider_name.trim().to_string(),
            payer_name: self.payer_name.filter(|s| !s.trim().is_empty()),
            field_observed: self.field_observed,
            system_a_name: self.system_a_name,
            system_a_value: self.system_a_value,
            system_b_name: self.system_b_name,
            system_b_value: self.system_b_value,
            corrected_value: self.corrected_value.trim().to_string(),
            evidence_type: self.evidence_type,
            evidence_notes: self.evidence_notes.filter(|s| !s.trim().is_empty()),
            submitted_by: submitter_id,
            submitted_by_email: submitter_email,
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
