use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::api::email::Email;
use crate::model::db::admin::NewAdmin;
use crate::model::db::registry::NewRegistryEntry;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw admin credentials, received from a user. These are never stored
/// directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = ();

    /// Convert [`AdminCredentials`] to a new admin by hashing the password.
    /// This enforces that the username is non-empty and the password meets
    /// the minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(());
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default()).unwrap(); // Safe because the default `Config` is valid.
        Ok(Self {
            username: cred.username,
            password_hash,
        })
    }
}

/// Request body for issuing a new unique voter ID.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewRegistryEntryRequest {
    pub unique_id: String,
    #[serde(default)]
    pub voter_name: Option<String>,
    #[serde(default)]
    pub issued_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<NewRegistryEntryRequest> for NewRegistryEntry {
    fn from(req: NewRegistryEntryRequest) -> Self {
        Self::new(req.unique_id, req.voter_name, req.issued_by, req.notes)
    }
}

/// Request body for activating/deactivating a registry entry.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// One row of the admin voter report: a registry entry joined against any
/// voter registered with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterReport {
    pub unique_id: String,
    pub voter_name: Option<String>,
    pub is_active: bool,
    pub registered: bool,
    pub email: Option<Email>,
    pub has_voted: bool,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCredentials {
        pub fn example1() -> Self {
            Self {
                username: "coordinator".into(),
                password: "one-ballot-each".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "coordinator2".into(),
                password: "totallysecurepassword".into(),
            }
        }

        pub fn empty() -> Self {
            Self {
                username: "".into(),
                password: "".into(),
            }
        }
    }
}
