use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core registry data: one admin-issued unique voter ID from the allow-list.
///
/// Entries are only ever created and (de)activated; using an ID does not
/// modify its entry, and entries are never deleted in normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntryCore {
    pub unique_id: String,
    pub is_active: bool,
    pub voter_name: Option<String>,
    pub issued_by: Option<String>,
    pub notes: Option<String>,
}

impl RegistryEntryCore {
    /// Create a new, active registry entry.
    pub fn new(
        unique_id: String,
        voter_name: Option<String>,
        issued_by: Option<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            unique_id,
            is_active: true,
            voter_name,
            issued_by,
            notes,
        }
    }
}

/// A registry entry without an ID.
pub type NewRegistryEntry = RegistryEntryCore;

/// A registry entry from the database, with its document ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub entry: RegistryEntryCore,
}

impl Deref for RegistryEntry {
    type Target = RegistryEntryCore;

    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}

impl DerefMut for RegistryEntry {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entry
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RegistryEntryCore {
        pub fn example() -> Self {
            Self::new(
                "NA-2024-0001".to_string(),
                Some("Ada Obi".to_string()),
                Some("electoral committee".to_string()),
                None,
            )
        }

        pub fn example2() -> Self {
            Self::new(
                "NA-2024-0002".to_string(),
                Some("Chidi Eze".to_string()),
                Some("electoral committee".to_string()),
                None,
            )
        }

        pub fn inactive_example() -> Self {
            Self {
                is_active: false,
                notes: Some("issued in error".to_string()),
                ..Self::new("NA-2024-0003".to_string(), None, None, None)
            }
        }
    }
}
