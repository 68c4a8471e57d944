//! Database schemas for Qanda
//!
//! Defines MongoDB document structures for users, questions, answers and votes.

mod answer;
mod metadata;
mod question;
mod user;
mod vote;

pub use answer::{AnswerDoc, ANSWER_COLLECTION};
pub use metadata::Metadata;
pub use question::{QuestionDoc, QUESTION_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
pub use vote::{TargetKind, VoteDirection, VoteDoc, VOTE_COLLECTION};
