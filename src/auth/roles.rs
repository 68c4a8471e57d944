//! Caller roles
//!
//! Ordered so that `role >= Role::Admin` reads as a permission check.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Role {
    /// Regular learner: ask, answer, vote, accept on own questions
    #[default]
    User = 0,
    /// Operator: may run maintenance such as vote reconciliation
    Admin = 1,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}
