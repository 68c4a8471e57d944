//! Question document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for questions
pub const QUESTION_COLLECTION: &str = "questions";

/// Question document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuestionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub author_id: ObjectId,

    pub title: String,

    pub body: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Cached signed sum of the vote ledger for this question.
    /// Maintained by increments only; see `VotingService::reconcile`.
    #[serde(default)]
    pub votes: i64,

    /// The single accepted answer, if any
    #[serde(default)]
    pub accepted_answer: Option<ObjectId>,
}

impl QuestionDoc {
    pub fn new(author_id: ObjectId, title: String, body: String, tags: Vec<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            author_id,
            title,
            body,
            tags,
            votes: 0,
            accepted_answer: None,
        }
    }
}

impl IntoIndexes for QuestionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "author_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_id_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_at_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for QuestionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
