//! Authentication and authorization for Qanda
//!
//! Identity is delegated: callers present a bearer JWT issued elsewhere and
//! this module only verifies it and resolves the caller.
//!
//! Provides:
//! - JWT token verification (and issuing, for operators and tests)
//! - Roles for admin-only operations
//! - `Identity`, the resolved caller handed to route handlers

pub mod jwt;
pub mod roles;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput};
pub use roles::Role;

use bson::oid::ObjectId;

use crate::types::QandaError;

/// Caller identity resolved from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: ObjectId,
    pub identifier: String,
    pub role: Role,
}

impl Identity {
    /// Build an identity from verified claims
    pub fn from_claims(claims: Claims) -> Result<Self, QandaError> {
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| QandaError::Unauthorized("Token subject is not a user id".into()))?;

        Ok(Self {
            user_id,
            identifier: claims.identifier,
            role: claims.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role >= Role::Admin
    }
}

/// Resolve the caller from an Authorization header value
pub fn resolve_identity(
    jwt: &JwtValidator,
    auth_header: Option<&str>,
) -> Result<Identity, QandaError> {
    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| QandaError::Unauthorized("No token provided".into()))?;

    Identity::from_claims(jwt.verify_token(token)?)
}
