//! Operator identity extraction
//!
//! The external authentication collaborator fronting this service injects
//! the operator's id and email as headers; the core never reads ambient
//! session state, so the extractor is the only place identity enters.

use crate::error::ApiError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use rostra_common::models::Identity;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-rostra-user-id";
pub const USER_EMAIL_HEADER: &str = "x-rostra-user-email";

/// Extractor for the identity headers
#[derive(Debug, Clone)]
pub struct OperatorIdentity(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for OperatorIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header"))
            })?;

        let user_id = Uuid::parse_str(user_id).map_err(|_| {
            ApiError::Unauthorized(format!("{USER_ID_HEADER} is not a valid UUID"))
        })?;

        let email = parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("missing {USER_EMAIL_HEADER} header"))
            })?;

        Ok(OperatorIdentity(Identity::new(user_id, email)))
    }
}
