use serde::{Deserialize, Serialize};

use crate::model::api::email::Email;
use crate::model::db::voter::Voter;

/// Request body for voter login/registration.
///
/// A malformed email address fails deserialisation, so it never reaches
/// the workflow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: Email,
    pub unique_id: String,
}

/// The result of checking a unique ID against the registry and the voter
/// records: may it be used to register right now?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdStatus {
    pub is_valid: bool,
    pub is_available: bool,
    pub message: Option<String>,
}

impl IdStatus {
    /// The ID is absent from the registry or deactivated.
    /// Availability is not looked up for an invalid ID.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            is_available: false,
            message: Some(message.into()),
        }
    }

    /// The ID is on the registry but a voter already holds it.
    pub fn used(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            is_available: false,
            message: Some(message.into()),
        }
    }

    /// The ID may be used to register.
    pub fn available() -> Self {
        Self {
            is_valid: true,
            is_available: true,
            message: None,
        }
    }
}

/// A voter as presented over the API. The ID is serialised as a hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDesc {
    pub id: String,
    pub email: Email,
    pub unique_id: String,
    pub has_voted: bool,
}

impl From<Voter> for VoterDesc {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id.to_string(),
            email: voter.voter.email,
            unique_id: voter.voter.unique_id,
            has_voted: voter.voter.has_voted,
        }
    }
}
