//! MongoDB content store
//!
//! Counters are updated with `$inc` through `find_one_and_update`, so two
//! requests touching the same question never lose each other's update.
//! The unique `(voter_id, target_id, target_kind)` index on the vote ledger
//! rejects a second concurrent insert for the same voter and target.

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use mongodb::options::FindOptions;

use crate::auth::Identity;
use crate::db::schemas::{
    AnswerDoc, QuestionDoc, TargetKind, UserDoc, VoteDirection, VoteDoc, ANSWER_COLLECTION,
    QUESTION_COLLECTION, USER_COLLECTION, VOTE_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::store::ContentStore;
use crate::types::{QandaError, Result};

/// Read the `$group` result of a ledger tally. No row means no votes.
fn tally_from_rows(rows: &[Document]) -> Result<i64> {
    let Some(row) = rows.first() else {
        return Ok(0);
    };
    match row.get("total") {
        Some(Bson::Int64(total)) => Ok(*total),
        Some(Bson::Int32(total)) => Ok(i64::from(*total)),
        other => Err(QandaError::Database(format!(
            "Unexpected ledger tally value: {:?}",
            other
        ))),
    }
}

/// Content store backed by MongoDB collections
#[derive(Clone)]
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    questions: MongoCollection<QuestionDoc>,
    answers: MongoCollection<AnswerDoc>,
    votes: MongoCollection<VoteDoc>,
}

impl MongoStore {
    /// Open every collection and apply indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: mongo.collection(USER_COLLECTION).await?,
            questions: mongo.collection(QUESTION_COLLECTION).await?,
            answers: mongo.collection(ANSWER_COLLECTION).await?,
            votes: mongo.collection(VOTE_COLLECTION).await?,
        })
    }

    fn vote_filter(voter_id: ObjectId, kind: TargetKind, target_id: ObjectId) -> Document {
        doc! {
            "voter_id": voter_id,
            "target_id": target_id,
            "target_kind": kind.as_str(),
        }
    }

    fn not_found(kind: TargetKind, id: ObjectId) -> QandaError {
        QandaError::NotFound(format!("{} {} not found", kind, id))
    }
}

#[async_trait::async_trait]
impl ContentStore for MongoStore {
    async fn find_question(&self, id: ObjectId) -> Result<Option<QuestionDoc>> {
        self.questions.find_one(doc! { "_id": id }).await
    }

    async fn find_answer(&self, id: ObjectId) -> Result<Option<AnswerDoc>> {
        self.answers.find_one(doc! { "_id": id }).await
    }

    async fn find_user(&self, id: ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "_id": id }).await
    }

    async fn list_questions(&self, limit: i64, skip: u64) -> Result<Vec<QuestionDoc>> {
        let options = FindOptions::builder()
            .sort(doc! { "_id": -1 })
            .skip(skip)
            .limit(limit)
            .build();
        self.questions.find_many(doc! {}, Some(options)).await
    }

    async fn list_answers(&self, question_id: ObjectId) -> Result<Vec<AnswerDoc>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        self.answers
            .find_many(doc! { "question_id": question_id }, Some(options))
            .await
    }

    async fn insert_question(&self, question: QuestionDoc) -> Result<ObjectId> {
        self.questions.insert_one(question).await
    }

    async fn insert_answer(&self, answer: AnswerDoc) -> Result<ObjectId> {
        self.answers.insert_one(answer).await
    }

    async fn ensure_user(&self, identity: &Identity) -> Result<()> {
        let now = DateTime::now();
        self.users
            .find_one_and_update(
                doc! { "_id": identity.user_id },
                doc! {
                    "$setOnInsert": {
                        "identifier": identity.identifier.clone(),
                        "role": identity.role.to_string(),
                        "reputation": 0_i64,
                        "metadata.is_deleted": false,
                        "metadata.created_at": now,
                        "metadata.updated_at": now,
                    }
                },
                true,
            )
            .await?;
        Ok(())
    }

    async fn find_vote(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
    ) -> Result<Option<VoteDoc>> {
        self.votes
            .find_one(Self::vote_filter(voter_id, kind, target_id))
            .await
    }

    async fn insert_vote(&self, vote: VoteDoc) -> Result<()> {
        self.votes.insert_one(vote).await.map(|_| ())
    }

    async fn set_vote_direction(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
        direction: VoteDirection,
    ) -> Result<()> {
        let result = self
            .votes
            .update_one(
                Self::vote_filter(voter_id, kind, target_id),
                doc! {
                    "$set": {
                        "direction": direction.as_str(),
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(QandaError::NotFound(format!(
                "Vote by {} on {} {} not found",
                voter_id, kind, target_id
            )));
        }
        Ok(())
    }

    async fn delete_vote(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
    ) -> Result<()> {
        self.votes
            .delete_one(Self::vote_filter(voter_id, kind, target_id))
            .await
            .map(|_| ())
    }

    async fn tally_votes(&self, kind: TargetKind, target_id: ObjectId) -> Result<i64> {
        let pipeline = vec![
            doc! { "$match": { "target_kind": kind.as_str(), "target_id": target_id } },
            doc! {
                "$group": {
                    "_id": null,
                    "total": {
                        "$sum": { "$cond": [{ "$eq": ["$direction", "up"] }, 1_i64, -1_i64] }
                    }
                }
            },
        ];

        let rows = self.votes.aggregate(pipeline).await?;
        tally_from_rows(&rows)
    }

    async fn increment_votes(
        &self,
        kind: TargetKind,
        target_id: ObjectId,
        delta: i64,
    ) -> Result<i64> {
        let filter = doc! { "_id": target_id };
        let update = doc! {
            "$inc": { "votes": delta },
            "$set": { "metadata.updated_at": DateTime::now() },
        };

        let votes = match kind {
            TargetKind::Question => self
                .questions
                .find_one_and_update(filter, update, false)
                .await?
                .map(|q| q.votes),
            TargetKind::Answer => self
                .answers
                .find_one_and_update(filter, update, false)
                .await?
                .map(|a| a.votes),
        };

        votes.ok_or_else(|| Self::not_found(kind, target_id))
    }

    async fn set_votes(&self, kind: TargetKind, target_id: ObjectId, votes: i64) -> Result<()> {
        let filter = doc! { "_id": target_id };
        let update = doc! {
            "$set": { "votes": votes, "metadata.updated_at": DateTime::now() },
        };

        let result = match kind {
            TargetKind::Question => self.questions.update_one(filter, update).await?,
            TargetKind::Answer => self.answers.update_one(filter, update).await?,
        };

        if result.matched_count == 0 {
            return Err(Self::not_found(kind, target_id));
        }
        Ok(())
    }

    async fn increment_reputation(&self, user_id: ObjectId, delta: i64) -> Result<i64> {
        let user = self
            .users
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! {
                    "$inc": { "reputation": delta },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
                true,
            )
            .await?;

        user.map(|u| u.reputation)
            .ok_or_else(|| QandaError::Database(format!("User {} upsert returned nothing", user_id)))
    }

    async fn set_answer_accepted(&self, answer_id: ObjectId, accepted: bool) -> Result<()> {
        let result = self
            .answers
            .update_one(
                doc! { "_id": answer_id },
                doc! {
                    "$set": {
                        "is_accepted": accepted,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Self::not_found(TargetKind::Answer, answer_id));
        }
        Ok(())
    }

    async fn set_accepted_answer(
        &self,
        question_id: ObjectId,
        answer_id: Option<ObjectId>,
    ) -> Result<()> {
        let result = self
            .questions
            .update_one(
                doc! { "_id": question_id },
                doc! {
                    "$set": {
                        "accepted_answer": answer_id,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Self::not_found(TargetKind::Question, question_id));
        }
        Ok(())
    }
}
