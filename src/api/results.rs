use std::collections::HashMap;

use mongodb::bson::doc;
use rocket::{
    futures::TryStreamExt,
    response::stream::{Event, EventStream},
    serde::json::Json,
    tokio::select,
    tokio::sync::broadcast::error::RecvError,
    Route, Shutdown, State,
};

use crate::{
    error::Result,
    live::UpdateNotifier,
    model::{
        api::tally::Tally,
        common::slate::Slate,
        db::vote::Vote,
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_tally, live_tally]
}

/// The current tally, zero-filled for every candidate on the slate.
#[get("/tally")]
async fn get_tally(votes: Coll<Vote>, slate: &State<Slate>) -> Result<Json<Tally>> {
    let tally = compute_tally(&votes, slate).await?;
    Ok(Json(tally))
}

/// Server-Sent Events stream of the tally.
///
/// Sends a snapshot on connect, then a freshly recomputed tally after every
/// committed vote batch. A consumer that lags simply skips intermediate
/// states: the next recomputation covers everything it missed.
#[get("/tally/live")]
fn live_tally(
    votes: Coll<Vote>,
    slate: &State<Slate>,
    notifier: &State<UpdateNotifier>,
    mut end: Shutdown,
) -> EventStream![] {
    let mut updates = notifier.subscribe();
    let slate = slate.inner().clone();
    EventStream! {
        // Snapshot on connect; if it fails, the next update recomputes.
        match compute_tally(&votes, &slate).await {
            Ok(tally) => yield Event::json(&tally),
            Err(err) => error!("Failed to compute tally snapshot: {err}"),
        }
        loop {
            select! {
                update = updates.recv() => match update {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        match compute_tally(&votes, &slate).await {
                            Ok(tally) => yield Event::json(&tally),
                            Err(err) => error!("Failed to recompute tally: {err}"),
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut end => break,
            }
        }
    }
}

/// Aggregate the vote ledger grouped by (position, candidate).
///
/// The slate is authoritative for the shape of the result: every slate
/// candidate appears (zero-filled), and ledger rows that no longer match
/// the slate are ignored.
async fn compute_tally(votes: &Coll<Vote>, slate: &Slate) -> Result<Tally> {
    let mut tally: Tally = slate
        .positions()
        .iter()
        .map(|position| {
            (
                position.id.clone(),
                position
                    .candidates
                    .iter()
                    .map(|candidate| (candidate.id.clone(), 0))
                    .collect::<HashMap<_, _>>(),
            )
        })
        .collect();

    let pipeline = vec![doc! {
        "$group": {
            "_id": { "position_id": "$position_id", "candidate_id": "$candidate_id" },
            "count": { "$sum": 1 },
        }
    }];
    let mut groups = votes.aggregate(pipeline, None).await?;
    while let Some(group) = groups.try_next().await? {
        let key = group.get_document("_id")?;
        let position_id = key.get_str("position_id")?;
        let candidate_id = key.get_str("candidate_id")?;
        // `$sum` widens to a long once the count outgrows an int.
        let count = match group.get_i32("count") {
            Ok(count) => count as u64,
            Err(_) => group.get_i64("count")? as u64,
        };
        if let Some(candidates) = tally.get_mut(position_id) {
            candidates.insert(candidate_id.to_string(), count);
        }
    }

    Ok(tally)
}
