//! GET /api/users/{id}

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::auth::Role;
use crate::routes::{json_response, parse_id, FullBody};
use crate::server::AppState;
use crate::types::{QandaError, Result};

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub identifier: String,
    pub role: Role,
    pub reputation: i64,
}

pub async fn get_user(state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let id = parse_id(id)?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| QandaError::NotFound(format!("user {} not found", id)))?;

    Ok(json_response(
        StatusCode::OK,
        &UserView {
            id: id.to_hex(),
            identifier: user.identifier,
            role: user.role,
            reputation: user.reputation,
        },
    ))
}
