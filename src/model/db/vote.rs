use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::common::slate::{CandidateId, PositionId};
use crate::model::mongodb::Id;

/// A single recorded choice in the vote ledger: one voter, one position,
/// one candidate.
///
/// Ledger rows are append-only. They are never mutated; they are deleted
/// only by the scoped and bulk admin deletion operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter_id: Id,
    pub position_id: PositionId,
    pub candidate_id: CandidateId,
}

impl VoteCore {
    pub fn new(voter_id: Id, position_id: PositionId, candidate_id: CandidateId) -> Self {
        Self {
            voter_id,
            position_id,
            candidate_id,
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its document ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}
