//! Qanda - questions, answers, votes and reputation for English learners
//!
//! The core is the voting and acceptance model:
//!
//! - **Vote ledger**: one vote per (voter, target); a repeated direction
//!   retracts, the opposite direction flips
//! - **Aggregates**: cached vote counts on content and reputation on users,
//!   only ever changed by atomic increments
//! - **Acceptance**: at most one accepted answer per question, chosen by the
//!   question's author, with a one-time reputation bonus
//!
//! Around it sit a MongoDB-backed content store, bearer-token identity and a
//! small JSON API.

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;
pub mod voting;

pub use config::Args;
pub use server::{run, serve, AppState};
pub use types::{QandaError, Result};
