use std::collections::HashMap;

use crate::model::common::slate::{CandidateId, PositionId};

/// The live tally: position → candidate → count, zero-filled for every
/// candidate on the slate.
///
/// Raw counts only; ordering and tie-breaking are presentation concerns.
pub type Tally = HashMap<PositionId, HashMap<CandidateId, u64>>;
