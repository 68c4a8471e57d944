//! Undo log for multi-step mutations
//!
//! A vote touches the ledger, the author's reputation and the target's
//! cached count; an acceptance touches two answers, the question and a
//! reputation counter. Each applied step pushes its inverse here. When a
//! later step fails the inverses run newest first. The final step of a
//! mutation has nothing after it to fail, so it records no inverse.

use bson::oid::ObjectId;
use tracing::{error, warn};

use crate::db::schemas::{TargetKind, VoteDirection, VoteDoc};
use crate::store::ContentStore;
use crate::types::QandaError;

/// Inverse of one applied store write
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    DeleteVote {
        voter: ObjectId,
        kind: TargetKind,
        target: ObjectId,
    },
    InsertVote(VoteDoc),
    SetVoteDirection {
        voter: ObjectId,
        kind: TargetKind,
        target: ObjectId,
        direction: VoteDirection,
    },
    Reputation {
        user: ObjectId,
        delta: i64,
    },
    AnswerAccepted {
        answer: ObjectId,
        accepted: bool,
    },
    AcceptedAnswer {
        question: ObjectId,
        answer: Option<ObjectId>,
    },
}

impl Compensation {
    async fn apply(&self, store: &dyn ContentStore) -> Result<(), QandaError> {
        match self {
            Compensation::DeleteVote {
                voter,
                kind,
                target,
            } => store.delete_vote(*voter, *kind, *target).await,
            Compensation::InsertVote(vote) => store.insert_vote(vote.clone()).await,
            Compensation::SetVoteDirection {
                voter,
                kind,
                target,
                direction,
            } => {
                store
                    .set_vote_direction(*voter, *kind, *target, *direction)
                    .await
            }
            Compensation::Reputation { user, delta } => {
                store.increment_reputation(*user, *delta).await.map(|_| ())
            }
            Compensation::AnswerAccepted { answer, accepted } => {
                store.set_answer_accepted(*answer, *accepted).await
            }
            Compensation::AcceptedAnswer { question, answer } => {
                store.set_accepted_answer(*question, *answer).await
            }
        }
    }
}

/// Inverses of the steps applied so far, in application order
#[derive(Debug, Default)]
pub struct CompensationLog {
    steps: Vec<Compensation>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every inverse newest first. Stops at the first inverse that fails
    /// and returns its error.
    pub async fn unwind(self, store: &dyn ContentStore) -> Result<(), QandaError> {
        for step in self.steps.into_iter().rev() {
            if let Err(e) = step.apply(store).await {
                return Err(QandaError::Internal(format!(
                    "compensation {:?} failed: {}",
                    step, e
                )));
            }
        }
        Ok(())
    }

    /// Turn a failed step into the error the caller sees.
    ///
    /// Nothing applied yet: the error passes through untouched. Otherwise
    /// the log is unwound; if that works the original error is returned,
    /// if not the result is `PartialFailure` naming `subject`.
    pub async fn fail(
        self,
        store: &dyn ContentStore,
        subject: &str,
        cause: QandaError,
    ) -> QandaError {
        if self.is_empty() {
            return cause;
        }

        let applied = self.len();
        warn!(subject, applied, error = %cause, "Mutation step failed, compensating");

        match self.unwind(store).await {
            Ok(()) => cause,
            Err(undo) => {
                error!(
                    subject,
                    error = %cause,
                    compensation_error = %undo,
                    "Compensation failed, aggregates may disagree with the ledger"
                );
                QandaError::PartialFailure(format!(
                    "{subject}: {cause}; rollback failed: {undo}"
                ))
            }
        }
    }
}
