//! User document schema
//!
//! Only the fields the voting core needs: who the user is and their reputation.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserDoc {
    /// MongoDB document ID (same id the bearer token carries as `sub`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// User identifier (email or username)
    #[serde(default)]
    pub identifier: String,

    #[serde(default)]
    pub role: Role,

    /// Reputation score. No floor: may go negative.
    #[serde(default)]
    pub reputation: i64,
}

impl UserDoc {
    pub fn new(id: ObjectId, identifier: String, role: Role) -> Self {
        Self {
            _id: Some(id),
            metadata: Metadata::new(),
            identifier,
            role,
            reputation: 0,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "identifier": 1 },
            Some(
                IndexOptions::builder()
                    .name("identifier_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
