//! Answer document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for answers
pub const ANSWER_COLLECTION: &str = "answers";

/// Answer document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnswerDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Parent question
    pub question_id: ObjectId,

    pub author_id: ObjectId,

    pub body: String,

    /// Cached signed sum of the vote ledger for this answer
    #[serde(default)]
    pub votes: i64,

    /// Mirrors `QuestionDoc::accepted_answer`; true on at most one answer per question
    #[serde(default)]
    pub is_accepted: bool,
}

impl AnswerDoc {
    pub fn new(question_id: ObjectId, author_id: ObjectId, body: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            question_id,
            author_id,
            body,
            votes: 0,
            is_accepted: false,
        }
    }
}

impl IntoIndexes for AnswerDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "question_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("question_id_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for AnswerDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
