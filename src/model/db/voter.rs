use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::api::email::Email;
use crate::model::mongodb::Id;

/// Core voter data, as stored in the database.
///
/// A row exists iff the (email, unique ID) pair has logged in successfully
/// at least once. The unique index on `unique_id` is what makes
/// registration first-write-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    pub email: Email,
    pub unique_id: String,
    pub has_voted: bool,
}

impl VoterCore {
    /// Create a new voter who has not yet voted.
    pub fn new(email: Email, unique_id: String) -> Self {
        Self {
            email,
            unique_id,
            has_voted: false,
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its document ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::db::registry::NewRegistryEntry;

    impl VoterCore {
        /// Matches `NewRegistryEntry::example()`.
        pub fn example() -> Self {
            Self::new(Email::example(), NewRegistryEntry::example().unique_id)
        }

        /// Matches `NewRegistryEntry::example2()`.
        pub fn example2() -> Self {
            Self::new(Email::example2(), NewRegistryEntry::example2().unique_id)
        }
    }
}
