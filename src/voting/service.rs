//! VotingService: the vote and accept operations
//!
//! Every mutation runs under the target's lock from `TargetLocks`, reads
//! the state it needs, then applies its steps in a fixed order, recording
//! the inverse of each applied step in a `CompensationLog`.

use bson::oid::ObjectId;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::schemas::{TargetKind, VoteDirection, VoteDoc};
use crate::store::ContentStore;
use crate::types::{QandaError, Result};
use crate::voting::acceptance::{AcceptanceChange, QuestionAcceptance, ACCEPT_BONUS};
use crate::voting::compensation::{Compensation, CompensationLog};
use crate::voting::ledger::VoteTransition;
use crate::voting::locks::TargetLocks;

/// Result of a vote request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    /// Cached vote count on the target after the change
    pub votes: i64,
    pub transition: VoteTransition,
    /// The voter's standing direction, `None` after a retraction
    pub direction: Option<VoteDirection>,
}

/// Result of an accept request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptOutcome {
    pub question_id: ObjectId,
    pub answer_id: ObjectId,
    /// Previously accepted answer, if one was demoted
    pub demoted: Option<ObjectId>,
    /// False when the answer was already the accepted one
    pub changed: bool,
}

/// Result of recomputing a target's cached count from the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub kind: TargetKind,
    pub target_id: ObjectId,
    pub cached: i64,
    pub actual: i64,
    pub repaired: bool,
}

pub struct VotingService {
    store: Arc<dyn ContentStore>,
    locks: TargetLocks,
}

impl VotingService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            locks: TargetLocks::new(),
        }
    }

    /// Cast, flip or retract `voter`'s vote on a question or answer.
    ///
    /// Steps, in order: ledger write, reputation delta to the content
    /// author, cached count delta on the target.
    pub async fn cast_vote(
        &self,
        voter: ObjectId,
        kind: TargetKind,
        target: ObjectId,
        direction: &str,
    ) -> Result<VoteOutcome> {
        let requested: VoteDirection = direction.parse()?;
        let store = self.store.as_ref();

        let _guard = self.locks.lock(kind, target).await;

        let author = store
            .find_author(kind, target)
            .await?
            .ok_or_else(|| QandaError::NotFound(format!("{} {} not found", kind, target)))?;

        let existing = store.find_vote(voter, kind, target).await?;
        let transition =
            VoteTransition::classify(existing.as_ref().map(|v| v.direction), requested);
        let deltas = transition.deltas(kind, requested);

        let subject = format!("vote by {} on {} {}", voter, kind, target);
        let mut undo = CompensationLog::new();

        // Ledger
        let ledger = match transition {
            VoteTransition::New => store
                .insert_vote(VoteDoc::new(voter, kind, target, requested))
                .await
                .map(|_| Compensation::DeleteVote {
                    voter,
                    kind,
                    target,
                }),
            VoteTransition::Retraction => {
                let removed = existing
                    .unwrap_or_else(|| VoteDoc::new(voter, kind, target, requested));
                store
                    .delete_vote(voter, kind, target)
                    .await
                    .map(|_| Compensation::InsertVote(removed))
            }
            VoteTransition::Flip => store
                .set_vote_direction(voter, kind, target, requested)
                .await
                .map(|_| Compensation::SetVoteDirection {
                    voter,
                    kind,
                    target,
                    direction: requested.opposite(),
                }),
        };
        match ledger {
            Ok(inverse) => undo.push(inverse),
            Err(e) => return Err(undo.fail(store, &subject, e).await),
        }

        // Author reputation
        if let Err(e) = store.increment_reputation(author, deltas.reputation).await {
            return Err(undo.fail(store, &subject, e).await);
        }
        undo.push(Compensation::Reputation {
            user: author,
            delta: -deltas.reputation,
        });

        // Cached count
        let votes = match store.increment_votes(kind, target, deltas.count).await {
            Ok(votes) => votes,
            Err(e) => return Err(undo.fail(store, &subject, e).await),
        };

        info!(
            voter = %voter,
            target = %target,
            kind = %kind,
            transition = transition.as_str(),
            votes,
            "Vote applied"
        );

        Ok(VoteOutcome {
            votes,
            transition,
            direction: transition.resulting_direction(requested),
        })
    }

    /// Mark `answer_id` as the accepted answer of its question.
    ///
    /// Only the question's author may do this. Accepting the answer that is
    /// already accepted changes nothing and grants no second bonus.
    pub async fn accept_answer(
        &self,
        requester: ObjectId,
        answer_id: ObjectId,
    ) -> Result<AcceptOutcome> {
        let store = self.store.as_ref();

        let answer = store
            .find_answer(answer_id)
            .await?
            .ok_or_else(|| QandaError::NotFound(format!("answer {} not found", answer_id)))?;
        let question_id = answer.question_id;

        let _guard = self.locks.lock(TargetKind::Question, question_id).await;

        let question = store.find_question(question_id).await?.ok_or_else(|| {
            QandaError::NotFound(format!(
                "question {} of answer {} not found",
                question_id, answer_id
            ))
        })?;

        if question.author_id != requester {
            return Err(QandaError::Forbidden(
                "Only the question author can accept an answer".into(),
            ));
        }

        let before = QuestionAcceptance::of(&question);
        let change = before.accept(answer_id);
        let (demote, promote) = match change {
            AcceptanceChange::Unchanged => {
                // Flag may have drifted if an earlier accept failed halfway
                let current = store.find_answer(answer_id).await?;
                if current.map(|a| !a.is_accepted).unwrap_or(false) {
                    warn!(answer = %answer_id, "Repairing accepted flag");
                    store.set_answer_accepted(answer_id, true).await?;
                }
                debug!(question = %question_id, answer = %answer_id, "Answer already accepted");
                return Ok(AcceptOutcome {
                    question_id,
                    answer_id,
                    demoted: None,
                    changed: false,
                });
            }
            AcceptanceChange::Changed { demote, promote } => (demote, promote),
        };

        let subject = format!("accept of answer {} on question {}", promote, question_id);
        let mut undo = CompensationLog::new();

        // Demote the previous answer; a deleted one has nothing to clear
        if let Some(previous) = demote {
            match store.set_answer_accepted(previous, false).await {
                Ok(()) => undo.push(Compensation::AnswerAccepted {
                    answer: previous,
                    accepted: true,
                }),
                Err(QandaError::NotFound(_)) => {
                    warn!(answer = %previous, "Previously accepted answer is gone");
                }
                Err(e) => return Err(undo.fail(store, &subject, e).await),
            }
        }

        // Promote
        if let Err(e) = store.set_answer_accepted(promote, true).await {
            return Err(undo.fail(store, &subject, e).await);
        }
        undo.push(Compensation::AnswerAccepted {
            answer: promote,
            accepted: false,
        });

        // Question pointer
        let after = change.apply(before);
        if let Err(e) = store
            .set_accepted_answer(question_id, after.accepted_answer())
            .await
        {
            return Err(undo.fail(store, &subject, e).await);
        }
        undo.push(Compensation::AcceptedAnswer {
            question: question_id,
            answer: before.accepted_answer(),
        });

        // Bonus
        if let Err(e) = store
            .increment_reputation(answer.author_id, ACCEPT_BONUS)
            .await
        {
            return Err(undo.fail(store, &subject, e).await);
        }

        info!(
            requester = %requester,
            question = %question_id,
            answer = %promote,
            demoted = ?demote,
            bonus = ACCEPT_BONUS,
            "Answer accepted"
        );

        Ok(AcceptOutcome {
            question_id,
            answer_id: promote,
            demoted: demote,
            changed: true,
        })
    }

    /// Recompute a target's cached vote count from the ledger and repair it
    /// if it drifted.
    pub async fn reconcile(&self, kind: TargetKind, target: ObjectId) -> Result<Reconciliation> {
        let store = self.store.as_ref();

        let _guard = self.locks.lock(kind, target).await;

        let cached = match kind {
            TargetKind::Question => store.find_question(target).await?.map(|q| q.votes),
            TargetKind::Answer => store.find_answer(target).await?.map(|a| a.votes),
        }
        .ok_or_else(|| QandaError::NotFound(format!("{} {} not found", kind, target)))?;

        let actual = store.tally_votes(kind, target).await?;
        let repaired = cached != actual;

        if repaired {
            store.set_votes(kind, target, actual).await?;
            warn!(
                kind = %kind,
                target = %target,
                cached,
                actual,
                "Repaired drifted vote count"
            );
        }

        Ok(Reconciliation {
            kind,
            target_id: target,
            cached,
            actual,
            repaired,
        })
    }
}
