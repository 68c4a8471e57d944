//! In-memory content store
//!
//! Backs dev mode and the test suite. Each record lives in a `DashMap`
//! shard; increments happen under the shard's write guard, so they are
//! atomic with respect to each other like `$inc` is in MongoDB.

use bson::oid::ObjectId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::auth::Identity;
use crate::db::schemas::{
    AnswerDoc, Metadata, QuestionDoc, TargetKind, UserDoc, VoteDirection, VoteDoc,
};
use crate::store::ContentStore;
use crate::types::{QandaError, Result};

type VoteKey = (ObjectId, TargetKind, ObjectId);

/// Content store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<ObjectId, UserDoc>,
    questions: DashMap<ObjectId, QuestionDoc>,
    answers: DashMap<ObjectId, AnswerDoc>,
    votes: DashMap<VoteKey, VoteDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger entries, across all targets
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    fn not_found(kind: TargetKind, id: ObjectId) -> QandaError {
        QandaError::NotFound(format!("{} {} not found", kind, id))
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
    async fn find_question(&self, id: ObjectId) -> Result<Option<QuestionDoc>> {
        Ok(self.questions.get(&id).map(|q| q.clone()))
    }

    async fn find_answer(&self, id: ObjectId) -> Result<Option<AnswerDoc>> {
        Ok(self.answers.get(&id).map(|a| a.clone()))
    }

    async fn find_user(&self, id: ObjectId) -> Result<Option<UserDoc>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn list_questions(&self, limit: i64, skip: u64) -> Result<Vec<QuestionDoc>> {
        let mut questions: Vec<QuestionDoc> =
            self.questions.iter().map(|q| q.value().clone()).collect();
        // ObjectIds grow with creation time
        questions.sort_by(|a, b| b._id.cmp(&a._id));

        Ok(questions
            .into_iter()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_answers(&self, question_id: ObjectId) -> Result<Vec<AnswerDoc>> {
        let mut answers: Vec<AnswerDoc> = self
            .answers
            .iter()
            .filter(|a| a.question_id == question_id)
            .map(|a| a.value().clone())
            .collect();
        answers.sort_by(|a, b| a._id.cmp(&b._id));
        Ok(answers)
    }

    async fn insert_question(&self, mut question: QuestionDoc) -> Result<ObjectId> {
        let id = ObjectId::new();
        question._id = Some(id);
        question.metadata = Metadata::new();
        self.questions.insert(id, question);
        Ok(id)
    }

    async fn insert_answer(&self, mut answer: AnswerDoc) -> Result<ObjectId> {
        let id = ObjectId::new();
        answer._id = Some(id);
        answer.metadata = Metadata::new();
        self.answers.insert(id, answer);
        Ok(id)
    }

    async fn ensure_user(&self, identity: &Identity) -> Result<()> {
        self.users.entry(identity.user_id).or_insert_with(|| {
            UserDoc::new(identity.user_id, identity.identifier.clone(), identity.role)
        });
        Ok(())
    }

    async fn find_vote(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
    ) -> Result<Option<VoteDoc>> {
        Ok(self
            .votes
            .get(&(voter_id, kind, target_id))
            .map(|v| v.clone()))
    }

    async fn insert_vote(&self, mut vote: VoteDoc) -> Result<()> {
        let key = (vote.voter_id, vote.target_kind, vote.target_id);
        match self.votes.entry(key) {
            Entry::Occupied(_) => Err(QandaError::Database(format!(
                "Duplicate vote by {} on {} {}",
                vote.voter_id, vote.target_kind, vote.target_id
            ))),
            Entry::Vacant(slot) => {
                // A restored vote keeps its id and creation time
                vote._id.get_or_insert_with(ObjectId::new);
                if vote.metadata.created_at.is_none() {
                    vote.metadata = Metadata::new();
                }
                slot.insert(vote);
                Ok(())
            }
        }
    }

    async fn set_vote_direction(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
        direction: VoteDirection,
    ) -> Result<()> {
        match self.votes.get_mut(&(voter_id, kind, target_id)) {
            Some(mut vote) => {
                vote.direction = direction;
                vote.metadata.updated_at = Some(bson::DateTime::now());
                Ok(())
            }
            None => Err(QandaError::NotFound(format!(
                "Vote by {} on {} {} not found",
                voter_id, kind, target_id
            ))),
        }
    }

    async fn delete_vote(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
    ) -> Result<()> {
        self.votes.remove(&(voter_id, kind, target_id));
        Ok(())
    }

    async fn tally_votes(&self, kind: TargetKind, target_id: ObjectId) -> Result<i64> {
        Ok(self
            .votes
            .iter()
            .filter(|v| v.target_kind == kind && v.target_id == target_id)
            .map(|v| v.direction.sign())
            .sum())
    }

    async fn increment_votes(
        &self,
        kind: TargetKind,
        target_id: ObjectId,
        delta: i64,
    ) -> Result<i64> {
        match kind {
            TargetKind::Question => {
                let mut question = self
                    .questions
                    .get_mut(&target_id)
                    .ok_or_else(|| Self::not_found(kind, target_id))?;
                question.votes += delta;
                Ok(question.votes)
            }
            TargetKind::Answer => {
                let mut answer = self
                    .answers
                    .get_mut(&target_id)
                    .ok_or_else(|| Self::not_found(kind, target_id))?;
                answer.votes += delta;
                Ok(answer.votes)
            }
        }
    }

    async fn set_votes(&self, kind: TargetKind, target_id: ObjectId, votes: i64) -> Result<()> {
        match kind {
            TargetKind::Question => {
                self.questions
                    .get_mut(&target_id)
                    .ok_or_else(|| Self::not_found(kind, target_id))?
                    .votes = votes;
            }
            TargetKind::Answer => {
                self.answers
                    .get_mut(&target_id)
                    .ok_or_else(|| Self::not_found(kind, target_id))?
                    .votes = votes;
            }
        }
        Ok(())
    }

    async fn increment_reputation(&self, user_id: ObjectId, delta: i64) -> Result<i64> {
        let mut user = self.users.entry(user_id).or_insert_with(|| UserDoc {
            _id: Some(user_id),
            metadata: Metadata::new(),
            ..UserDoc::default()
        });
        user.reputation += delta;
        Ok(user.reputation)
    }

    async fn set_answer_accepted(&self, answer_id: ObjectId, accepted: bool) -> Result<()> {
        self.answers
            .get_mut(&answer_id)
            .ok_or_else(|| Self::not_found(TargetKind::Answer, answer_id))?
            .is_accepted = accepted;
        Ok(())
    }

    async fn set_accepted_answer(
        &self,
        question_id: ObjectId,
        answer_id: Option<ObjectId>,
    ) -> Result<()> {
        self.questions
            .get_mut(&question_id)
            .ok_or_else(|| Self::not_found(TargetKind::Question, question_id))?
            .accepted_answer = answer_id;
        Ok(())
    }
}
