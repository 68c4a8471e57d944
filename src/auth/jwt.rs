//! JWT bearer tokens
//!
//! Tokens are issued by the external sign-in provider and signed with HS256
//! using the shared `JWT_SECRET`. The subject is the user's ObjectId.
//! `generate_token` exists for operators and tests.

use bson::oid::ObjectId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::config::Args;
use crate::types::QandaError;

const MIN_SECRET_LEN: usize = 32;
const DEV_SECRET: &str = "qanda-dev-secret-never-use-in-production";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ObjectId, hex
    pub sub: String,
    /// Email or username
    pub identifier: String,
    #[serde(default)]
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: ObjectId,
    pub identifier: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, QandaError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(QandaError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Fixed secret, only accepted in dev mode
    pub fn new_dev() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            expiry_seconds: 3600,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self, QandaError> {
        match (&args.jwt_secret, args.dev_mode) {
            (Some(secret), _) => Self::new(secret.clone(), args.jwt_expiry_seconds),
            (None, true) => Ok(Self::new_dev()),
            (None, false) => Err(QandaError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    pub fn generate_token(&self, input: TokenInput) -> Result<String, QandaError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: input.user_id.to_hex(),
            identifier: input.identifier,
            role: input.role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Verify signature and expiry; any failure is `Unauthorized`
    pub fn verify_token(&self, token: &str) -> Result<Claims, QandaError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Invalid token",
            };
            QandaError::Unauthorized(reason.into())
        })
    }
}

/// Token from an Authorization header: `Bearer <token>` or a bare token
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?.trim_start();
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => header,
    };
    (!token.is_empty()).then_some(token)
}
