use aws_sdk_sesv2::Client as SesClient;
use chrono::Utc;
use mongodb::{
    bson::doc,
    error::TRANSIENT_TRANSACTION_ERROR,
    Client, ClientSession,
};
use rocket::{serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    live::UpdateNotifier,
    mailer,
    model::{
        api::voter::VoterDesc,
        auth::AuthToken,
        common::{ballot::BallotPaper, slate::Slate},
        db::{
            vote::NewVote,
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
};

use super::common::{commit_with_retry, voter_by_token};

pub fn routes() -> Vec<Route> {
    routes![get_ballot, get_voter, submit_votes]
}

/// The fixed slate of positions and candidates on this election's ballot.
#[get("/ballot")]
fn get_ballot(slate: &State<Slate>) -> Json<Slate> {
    Json(slate.inner().clone())
}

/// The logged-in voter's own record.
///
/// This is also the re-query path for clients whose submission timed out
/// with an unknown outcome: `has_voted` here is authoritative.
#[get("/voter")]
async fn get_voter(token: AuthToken<Voter>, voters: Coll<Voter>) -> Result<Json<VoterDesc>> {
    let voter = voter_by_token(&token, &voters).await?;
    Ok(Json(voter.into()))
}

/// Submit a full-slate ballot for the logged-in voter.
///
/// The ledger insert and the `has_voted` flip commit as a single
/// transaction: either the whole ballot is recorded and the voter is marked
/// as having voted, or nothing changes. Everything after the commit
/// (change notification, emails) is best-effort and cannot fail the
/// submission.
#[post("/votes", data = "<ballot>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn submit_votes(
    token: AuthToken<Voter>,
    ballot: Json<BallotPaper>,
    voters: Coll<Voter>,
    votes: Coll<NewVote>,
    slate: &State<Slate>,
    config: &State<Config>,
    ses: &State<SesClient>,
    notifier: &State<UpdateNotifier>,
    db_client: &State<Client>,
) -> Result<()> {
    let voter = voter_by_token(&token, &voters).await?;
    let ballot = ballot.0;

    // Full-slate check: every position exactly once, every choice a known
    // candidate of its position.
    slate.check_ballot(&ballot)?;

    let new_votes = ballot
        .iter()
        .map(|(position_id, candidate_id)| {
            NewVote::new(voter.id, position_id.clone(), candidate_id.clone())
        })
        .collect::<Vec<_>>();

    // Write the ballot, retrying the whole unit on transient failures.
    // Individual writes are never retried in isolation.
    let mut session = db_client.start_session(None).await?;
    'txn: loop {
        session.start_transaction(None).await?;
        match write_ballot(&mut session, &voters, &votes, voter.id, &new_votes).await {
            Ok(()) => {
                commit_with_retry(&mut session).await?;
                break 'txn;
            }
            Err(Error::Db(err)) if err.contains_label(TRANSIENT_TRANSACTION_ERROR) => {
                session.abort_transaction().await?;
                continue 'txn;
            }
            Err(err) => {
                session.abort_transaction().await?;
                return Err(err);
            }
        }
    }

    // The authoritative outcome is committed; everything below is
    // best-effort.
    notifier.notify();
    mailer::dispatch_vote_emails(
        ses.inner().clone(),
        config,
        slate,
        &voter,
        &ballot,
        Utc::now(),
    );

    Ok(())
}

/// The atomic unit of a submission: flip `has_voted` (gated on it currently
/// being false) and append the ballot's ledger rows. A voter whose flag is
/// already set aborts with a conflict before any row is written.
async fn write_ballot(
    session: &mut ClientSession,
    voters: &Coll<Voter>,
    votes: &Coll<NewVote>,
    voter_id: Id,
    new_votes: &[NewVote],
) -> Result<()> {
    let gate = doc! { "_id": voter_id, "has_voted": false };
    let update = doc! { "$set": { "has_voted": true } };
    let updated = voters
        .update_one_with_session(gate, update, None, session)
        .await?;
    if updated.modified_count != 1 {
        return Err(Error::conflict("This voter has already voted"));
    }
    votes
        .insert_many_with_session(new_votes, None, session)
        .await?;
    Ok(())
}
