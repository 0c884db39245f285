use std::io::Cursor;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::bson::document::ValueAccessError;
use mongodb::error::Error as DbError;
use rocket::{
    http::{ContentType, Status},
    response::Responder,
    serde::json::json,
    Response,
};
use thiserror::Error;

use crate::model::common::slate::BallotError;

pub type Result<T> = std::result::Result<T, Error>;

/// The application failure taxonomy.
///
/// `Validation` and `Conflict` are user-correctable and carry their detail
/// to the client; `Db` is logged server-side and surfaced as a generic
/// retryable failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    DbValue(#[from] ValueAccessError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<BallotError> for Error {
    /// An incomplete ballot is a conflict (the voter must change what they
    /// are submitting); an unknown position or candidate is plain bad input.
    fn from(err: BallotError) -> Self {
        match err {
            BallotError::MissingPosition(_) => Self::Conflict(err.to_string()),
            BallotError::UnknownPosition(_) | BallotError::UnknownCandidate { .. } => {
                Self::Validation(err.to_string())
            }
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    /// Map to an HTTP status plus a small JSON body `{error, message}` so
    /// clients can distinguish failure classes.
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let (status, message) = match self {
            Self::Validation(msg) => (Status::UnprocessableEntity, msg),
            Self::Conflict(msg) => (Status::Conflict, msg),
            Self::Unauthorized(msg) => (Status::Unauthorized, msg),
            Self::NotFound(msg) => (Status::NotFound, msg),
            Self::Db(err) => {
                error!("Database error: {err}");
                (
                    Status::InternalServerError,
                    "Temporary storage failure; please try again".to_string(),
                )
            }
            Self::DbValue(err) => {
                error!("Malformed database document: {err}");
                (
                    Status::InternalServerError,
                    "Temporary storage failure; please try again".to_string(),
                )
            }
            Self::Jwt(err) => match err.into_kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => (
                    Status::Unauthorized,
                    "Session expired; log in again".to_string(),
                ),
                _ => (Status::BadRequest, "Malformed session token".to_string()),
            },
        };

        let body = json!({
            "error": status.reason_lossy(),
            "message": message,
        })
        .to_string();

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
