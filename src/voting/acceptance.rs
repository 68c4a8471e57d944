//! Accepted-answer state machine
//!
//! A question is either `Unaccepted` or `Accepted(answer)`. Every change
//! goes through [`QuestionAcceptance::accept`], which names both the answer
//! to promote and the one (if any) to demote, so the question pointer and
//! the answers' `is_accepted` flags are always derived from one decision.

use bson::oid::ObjectId;

use crate::db::schemas::QuestionDoc;

/// Reputation granted to an answer's author when the answer is accepted.
/// Never revoked, even if another answer is accepted later.
pub const ACCEPT_BONUS: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionAcceptance {
    Unaccepted,
    Accepted(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceChange {
    /// The answer is already the accepted one; no writes, no bonus
    Unchanged,
    Changed {
        demote: Option<ObjectId>,
        promote: ObjectId,
    },
}

impl QuestionAcceptance {
    pub fn of(question: &QuestionDoc) -> Self {
        question.accepted_answer.into()
    }

    pub fn accepted_answer(&self) -> Option<ObjectId> {
        match self {
            QuestionAcceptance::Unaccepted => None,
            QuestionAcceptance::Accepted(id) => Some(*id),
        }
    }

    pub fn accept(&self, answer_id: ObjectId) -> AcceptanceChange {
        match self {
            QuestionAcceptance::Accepted(current) if *current == answer_id => {
                AcceptanceChange::Unchanged
            }
            QuestionAcceptance::Accepted(current) => AcceptanceChange::Changed {
                demote: Some(*current),
                promote: answer_id,
            },
            QuestionAcceptance::Unaccepted => AcceptanceChange::Changed {
                demote: None,
                promote: answer_id,
            },
        }
    }
}

impl From<Option<ObjectId>> for QuestionAcceptance {
    fn from(accepted: Option<ObjectId>) -> Self {
        match accepted {
            Some(id) => QuestionAcceptance::Accepted(id),
            None => QuestionAcceptance::Unaccepted,
        }
    }
}

impl AcceptanceChange {
    /// State of the question after the change is applied to `before`
    pub fn apply(&self, before: QuestionAcceptance) -> QuestionAcceptance {
        match self {
            AcceptanceChange::Unchanged => before,
            AcceptanceChange::Changed { promote, .. } => QuestionAcceptance::Accepted(*promote),
        }
    }
}
