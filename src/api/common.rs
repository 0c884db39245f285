use mongodb::error::UNKNOWN_TRANSACTION_COMMIT_RESULT;
use mongodb::ClientSession;

use crate::error::{Error, Result};
use crate::model::{auth::AuthToken, db::voter::Voter, mongodb::Coll};

/// Return the voter behind an auth token.
pub async fn voter_by_token(token: &AuthToken<Voter>, voters: &Coll<Voter>) -> Result<Voter> {
    voters
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::unauthorized("Voter session is no longer valid"))
}

/// Commit the open transaction, retrying while the driver reports the
/// outcome as unknown.
pub async fn commit_with_retry(session: &mut ClientSession) -> Result<()> {
    loop {
        match session.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(err) if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) => continue,
            Err(err) => return Err(err.into()),
        }
    }
}
