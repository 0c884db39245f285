use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::api::admin::AdminCredentials;
use crate::model::mongodb::{Coll, Id};

/// Username of the admin account created automatically on first launch.
pub const DEFAULT_ADMIN_USERNAME: &str = "returning-officer";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // Unwrap safe because the only way to create an AdminCore is via
        // TryFrom<AdminCredentials>, so the hash is always well-formed.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap()
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Ensure at least one admin account exists, creating the default one from
/// config if the collection is empty.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>, config: &Config) -> Result<()> {
    let count = admins.count_documents(None, None).await?;
    if count == 0 {
        let credentials = AdminCredentials {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: config.default_admin_password().to_string(),
        };
        let admin: NewAdmin = credentials.try_into().map_err(|_| {
            Error::validation("Configured default admin password is too short")
        })?;
        admins.insert_one(admin, None).await?;
        warn!("Created default admin '{DEFAULT_ADMIN_USERNAME}'; change its password");
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCore {
        /// Matches `AdminCredentials::example1()`.
        pub fn example() -> Self {
            AdminCredentials::example1().try_into().unwrap()
        }
    }
}
