//! Vote ledger schema
//!
//! One document per (voter, target, target kind). A flip mutates the
//! direction in place; a repeated direction deletes the document.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::QandaError;

/// Collection name for the vote ledger
pub const VOTE_COLLECTION: &str = "votes";

/// Kind of content a vote applies to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Question,
    Answer,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Question => "question",
            TargetKind::Answer => "answer",
        }
    }

    /// Parse the plural path segment used by the HTTP routes
    pub fn from_collection_segment(segment: &str) -> Result<Self, QandaError> {
        match segment {
            "questions" => Ok(TargetKind::Question),
            "answers" => Ok(TargetKind::Answer),
            other => Err(QandaError::InvalidArgument(format!(
                "Unknown target kind '{other}', expected 'questions' or 'answers'"
            ))),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a vote
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// +1 for up, -1 for down
    pub fn sign(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            VoteDirection::Up => VoteDirection::Down,
            VoteDirection::Down => VoteDirection::Up,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

impl FromStr for VoteDirection {
    type Err = QandaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            other => Err(QandaError::InvalidArgument(format!(
                "Invalid vote direction '{other}', expected 'up' or 'down'"
            ))),
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vote document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VoteDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub voter_id: ObjectId,

    pub target_id: ObjectId,

    pub target_kind: TargetKind,

    pub direction: VoteDirection,
}

impl VoteDoc {
    pub fn new(
        voter_id: ObjectId,
        target_kind: TargetKind,
        target_id: ObjectId,
        direction: VoteDirection,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            voter_id,
            target_id,
            target_kind,
            direction,
        }
    }
}

impl IntoIndexes for VoteDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One vote per voter per target
            (
                doc! { "voter_id": 1, "target_id": 1, "target_kind": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("voter_target_unique".to_string())
                        .build(),
                ),
            ),
            // Ledger scans for reconciliation
            (
                doc! { "target_kind": 1, "target_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("target_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for VoteDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
