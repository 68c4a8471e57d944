//! MongoDB persistence
//!
//! Typed collection wrapper plus the document schemas for users,
//! questions, answers and the vote ledger.

pub mod mongo;
pub mod schemas;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
