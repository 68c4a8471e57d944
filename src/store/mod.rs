//! Content store
//!
//! The persistence seam of the voting core. Handlers and the voting service
//! only talk to `ContentStore`; MongoDB and an in-memory map implement it.
//!
//! Aggregate fields (`votes`, `reputation`) are only ever changed through
//! the `increment_*` methods, which are single atomic operations in every
//! implementation. Nothing reads a counter, adds to it, and writes it back.

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use bson::oid::ObjectId;

use crate::auth::Identity;
use crate::db::schemas::{AnswerDoc, QuestionDoc, TargetKind, UserDoc, VoteDirection, VoteDoc};
use crate::types::Result;

/// Persistence operations used by the voting core and the HTTP routes
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    async fn find_question(&self, id: ObjectId) -> Result<Option<QuestionDoc>>;

    async fn find_answer(&self, id: ObjectId) -> Result<Option<AnswerDoc>>;

    async fn find_user(&self, id: ObjectId) -> Result<Option<UserDoc>>;

    /// Newest first
    async fn list_questions(&self, limit: i64, skip: u64) -> Result<Vec<QuestionDoc>>;

    /// Oldest first
    async fn list_answers(&self, question_id: ObjectId) -> Result<Vec<AnswerDoc>>;

    async fn insert_question(&self, question: QuestionDoc) -> Result<ObjectId>;

    async fn insert_answer(&self, answer: AnswerDoc) -> Result<ObjectId>;

    /// Create the user record for an identity if it does not exist yet
    async fn ensure_user(&self, identity: &Identity) -> Result<()>;

    /// Author of a question or answer, `None` if the target does not exist
    async fn find_author(&self, kind: TargetKind, id: ObjectId) -> Result<Option<ObjectId>> {
        Ok(match kind {
            TargetKind::Question => self.find_question(id).await?.map(|q| q.author_id),
            TargetKind::Answer => self.find_answer(id).await?.map(|a| a.author_id),
        })
    }

    // -------------------------------------------------------------------------
    // Vote ledger
    // -------------------------------------------------------------------------

    async fn find_vote(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
    ) -> Result<Option<VoteDoc>>;

    /// Fails if the voter already has a vote on the target
    async fn insert_vote(&self, vote: VoteDoc) -> Result<()>;

    async fn set_vote_direction(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
        direction: VoteDirection,
    ) -> Result<()>;

    async fn delete_vote(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
    ) -> Result<()>;

    /// Signed sum of every ledger entry for the target
    async fn tally_votes(&self, kind: TargetKind, target_id: ObjectId) -> Result<i64>;

    // -------------------------------------------------------------------------
    // Aggregates
    // -------------------------------------------------------------------------

    /// Atomically add `delta` to the target's cached vote count and return the new count
    async fn increment_votes(&self, kind: TargetKind, target_id: ObjectId, delta: i64)
        -> Result<i64>;

    /// Overwrite the cached vote count (reconciliation only)
    async fn set_votes(&self, kind: TargetKind, target_id: ObjectId, votes: i64) -> Result<()>;

    /// Atomically add `delta` to a user's reputation, creating the user record if absent
    async fn increment_reputation(&self, user_id: ObjectId, delta: i64) -> Result<i64>;

    // -------------------------------------------------------------------------
    // Acceptance
    // -------------------------------------------------------------------------

    async fn set_answer_accepted(&self, answer_id: ObjectId, accepted: bool) -> Result<()>;

    async fn set_accepted_answer(
        &self,
        question_id: ObjectId,
        answer_id: Option<ObjectId>,
    ) -> Result<()>;
}
