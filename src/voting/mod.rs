//! Voting core
//!
//! - **ledger**: classifies a vote request against the voter's existing vote
//!   and yields the exact count and reputation deltas
//! - **acceptance**: the accepted-answer state machine
//! - **locks**: per-target serialization of mutations
//! - **compensation**: undo log for multi-step mutations
//! - **service**: `VotingService`, which ties them to a `ContentStore`

pub mod acceptance;
pub mod compensation;
pub mod ledger;
pub mod locks;
pub mod service;

pub use acceptance::{AcceptanceChange, QuestionAcceptance, ACCEPT_BONUS};
pub use ledger::{VoteDeltas, VoteTransition};
pub use locks::TargetLocks;
pub use service::{AcceptOutcome, Reconciliation, VoteOutcome, VotingService};
