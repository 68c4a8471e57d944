//! Shared types for Qanda

pub mod error;

pub use error::{QandaError, Result};
