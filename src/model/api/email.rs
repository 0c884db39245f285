use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A voter's email address.
///
/// Validation is syntactic only (one `@`, non-empty local part, dotted
/// domain); deliverability is the notification dispatcher's problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email {
    inner: String,
}

impl Email {
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Not a valid email address: {0:?}")]
pub struct EmailParseError(String);

impl FromStr for Email {
    type Err = EmailParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || EmailParseError(s.to_string());
        if s.chars().any(char::is_whitespace) {
            return Err(err());
        }
        let (local, domain) = s.split_once('@').ok_or_else(err)?;
        if local.is_empty() || domain.contains('@') {
            return Err(err());
        }
        // The domain must contain a dot with a label either side of it.
        let dotted = domain.split('.').count() >= 2
            && domain.split('.').all(|label| !label.is_empty());
        if !dotted {
            return Err(err());
        }
        Ok(Self {
            inner: s.to_string(),
        })
    }
}

impl TryFrom<String> for Email {
    type Error = EmailParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.inner
    }
}

impl From<Email> for Bson {
    fn from(email: Email) -> Self {
        Bson::String(email.inner)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Email {
        pub fn example() -> Self {
            "ada.obi@example.com".parse().unwrap()
        }

        pub fn example2() -> Self {
            "chidi.eze@example.com".parse().unwrap()
        }
    }
}
