use std::collections::HashMap;

use super::slate::{CandidateId, PositionId};

/// A full ballot paper as submitted by a voter: one chosen candidate per
/// position on the slate.
pub type BallotPaper = HashMap<PositionId, CandidateId>;
