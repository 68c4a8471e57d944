//! Vote ledger transitions and their aggregate deltas
//!
//! | Transition | Count        | Question author | Answer author |
//! |------------|--------------|-----------------|---------------|
//! | New        | up +1 / -1   | up +2 / -1      | up +5 / -1    |
//! | Retraction | up -1 / +1   | up -2 / +1      | up -5 / +1    |
//! | Flip       | up +2 / -2   | up +4 / -4      | up +10 / -10  |
//!
//! "up"/"down" is the direction in the request. For a retraction it equals
//! the stored direction; for a flip it is the new one.

use serde::Serialize;

use crate::db::schemas::{TargetKind, VoteDirection};

/// What a vote request does to the voter's ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteTransition {
    /// No existing vote: insert one
    New,
    /// Same direction as the existing vote: delete it
    Retraction,
    /// Opposite direction: rewrite it in place
    Flip,
}

/// Changes to apply to the target's vote count and its author's reputation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteDeltas {
    pub count: i64,
    pub reputation: i64,
}

impl VoteTransition {
    pub fn classify(existing: Option<VoteDirection>, requested: VoteDirection) -> Self {
        match existing {
            None => VoteTransition::New,
            Some(current) if current == requested => VoteTransition::Retraction,
            Some(_) => VoteTransition::Flip,
        }
    }

    pub fn deltas(&self, kind: TargetKind, requested: VoteDirection) -> VoteDeltas {
        use TargetKind::{Answer, Question};
        use VoteDirection::{Down, Up};

        let (count, reputation) = match (self, kind, requested) {
            (VoteTransition::New, Question, Up) => (1, 2),
            (VoteTransition::New, Question, Down) => (-1, -1),
            (VoteTransition::New, Answer, Up) => (1, 5),
            (VoteTransition::New, Answer, Down) => (-1, -1),

            (VoteTransition::Retraction, Question, Up) => (-1, -2),
            (VoteTransition::Retraction, Question, Down) => (1, 1),
            (VoteTransition::Retraction, Answer, Up) => (-1, -5),
            (VoteTransition::Retraction, Answer, Down) => (1, 1),

            (VoteTransition::Flip, Question, Up) => (2, 4),
            (VoteTransition::Flip, Question, Down) => (-2, -4),
            (VoteTransition::Flip, Answer, Up) => (2, 10),
            (VoteTransition::Flip, Answer, Down) => (-2, -10),
        };

        VoteDeltas { count, reputation }
    }

    /// The voter's direction on the target once this transition is applied
    pub fn resulting_direction(&self, requested: VoteDirection) -> Option<VoteDirection> {
        match self {
            VoteTransition::New | VoteTransition::Flip => Some(requested),
            VoteTransition::Retraction => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteTransition::New => "new",
            VoteTransition::Retraction => "retraction",
            VoteTransition::Flip => "flip",
        }
    }
}
