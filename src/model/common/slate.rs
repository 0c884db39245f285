use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ballot::BallotPaper;

/// Identifies a position on the slate, e.g. `president`.
pub type PositionId = String;
/// Identifies a candidate within a position, e.g. `raphael-iyama`.
pub type CandidateId = String;

/// A candidate standing for a single position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
}

/// An electable position and its candidate roster, in ballot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub title: String,
    pub candidates: Vec<Candidate>,
}

impl Position {
    /// Look up a candidate on this position's roster.
    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

/// The fixed slate for this election cycle: every position and its
/// candidates, in ballot order.
///
/// Loaded once from application config at startup and placed in managed
/// state; read-only at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slate {
    positions: Vec<Position>,
}

impl Slate {
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Look up a position by ID.
    pub fn position(&self, id: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    /// Check that a ballot paper covers every position on the slate exactly
    /// once, and that every choice names a known candidate of its position.
    pub fn check_ballot(&self, ballot: &BallotPaper) -> Result<(), BallotError> {
        for position in &self.positions {
            match ballot.get(&position.id) {
                None => return Err(BallotError::MissingPosition(position.id.clone())),
                Some(candidate_id) => {
                    if position.candidate(candidate_id).is_none() {
                        return Err(BallotError::UnknownCandidate {
                            position: position.id.clone(),
                            candidate: candidate_id.clone(),
                        });
                    }
                }
            }
        }
        // Every slate position is covered; anything left over is not on the slate.
        if let Some(extra) = ballot.keys().find(|id| self.position(id).is_none()) {
            return Err(BallotError::UnknownPosition(extra.clone()));
        }
        Ok(())
    }
}

/// Why a ballot paper was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("Ballot is missing a choice for position '{0}'")]
    MissingPosition(PositionId),
    #[error("Ballot references unknown position '{0}'")]
    UnknownPosition(PositionId),
    #[error("'{candidate}' is not a candidate for position '{position}'")]
    UnknownCandidate {
        position: PositionId,
        candidate: CandidateId,
    },
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Slate {
        pub fn example() -> Self {
            Self {
                positions: vec![
                    Position {
                        id: "president".to_string(),
                        title: "President".to_string(),
                        candidates: vec![
                            Candidate {
                                id: "raphael-iyama".to_string(),
                                name: "Hon. Raphael Iyama".to_string(),
                            },
                            Candidate {
                                id: "ogbaji-edor-raymond".to_string(),
                                name: "Ogbaji Edor Raymond".to_string(),
                            },
                        ],
                    },
                    Position {
                        id: "secretary".to_string(),
                        title: "Secretary".to_string(),
                        candidates: vec![
                            Candidate {
                                id: "sunday-dsp".to_string(),
                                name: "Sunday DSP".to_string(),
                            },
                            Candidate {
                                id: "blessing-odii".to_string(),
                                name: "Blessing Odii".to_string(),
                            },
                        ],
                    },
                ],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_ballot(slate: &Slate) -> BallotPaper {
        slate
            .positions()
            .iter()
            .map(|p| (p.id.clone(), p.candidates[0].id.clone()))
            .collect()
    }

    #[test]
    fn accepts_complete_ballot() {
        let slate = Slate::example();
        assert_eq!(Ok(()), slate.check_ballot(&full_ballot(&slate)));
    }

    #[test]
    fn rejects_missing_position() {
        let slate = Slate::example();
        let mut ballot = full_ballot(&slate);
        ballot.remove("secretary");
        assert_eq!(
            Err(BallotError::MissingPosition("secretary".to_string())),
            slate.check_ballot(&ballot)
        );
    }

    #[test]
    fn rejects_unknown_position() {
        let slate = Slate::example();
        let mut ballot = full_ballot(&slate);
        ballot.insert("treasurer".to_string(), "anyone".to_string());
        assert_eq!(
            Err(BallotError::UnknownPosition("treasurer".to_string())),
            slate.check_ballot(&ballot)
        );
    }

    #[test]
    fn rejects_unknown_candidate() {
        let slate = Slate::example();
        let mut ballot = full_ballot(&slate);
        ballot.insert("president".to_string(), "sunday-dsp".to_string());
        assert_eq!(
            Err(BallotError::UnknownCandidate {
                position: "president".to_string(),
                candidate: "sunday-dsp".to_string(),
            }),
            slate.check_ballot(&ballot)
        );
    }

    #[test]
    fn candidate_lookup() {
        let slate = Slate::example();
        let president = slate.position("president").unwrap();
        assert!(president.candidate("raphael-iyama").is_some());
        assert!(president.candidate("nobody").is_none());
        assert!(slate.position("treasurer").is_none());
    }
}
