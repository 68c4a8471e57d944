//! Vote and accept endpoints
//!
//! - POST  /api/questions/{id}/vote  `{ "direction": "up" | "down" }`
//! - POST  /api/answers/{id}/vote    `{ "direction": "up" | "down" }`
//! - PATCH /api/answers/{id}/accept

use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::schemas::TargetKind;
use crate::routes::{authenticate, json_response, parse_id, parse_json, FullBody};
use crate::server::AppState;
use crate::types::{QandaError, Result};

/// Any JSON is accepted for `direction`; whatever is not "up" or "down"
/// is rejected as `INVALID_ARGUMENT` by the voting service
#[derive(Debug, Default, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub direction: Option<Value>,
}

impl VoteRequest {
    pub fn direction(&self) -> Result<&str> {
        match &self.direction {
            Some(Value::String(direction)) => Ok(direction.as_str()),
            Some(other) => Err(QandaError::InvalidArgument(format!(
                "Invalid vote direction {}, expected 'up' or 'down'",
                other
            ))),
            None => Err(QandaError::InvalidArgument(
                "Vote direction is required, expected 'up' or 'down'".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub success: bool,
    pub question_id: String,
    pub answer_id: String,
    pub changed: bool,
    pub demoted: Option<String>,
}

pub async fn handle_vote(
    state: &AppState,
    headers: &HeaderMap,
    kind: TargetKind,
    target: &str,
    body: &[u8],
) -> Result<Response<FullBody>> {
    let identity = authenticate(state, headers).await?;
    let target = parse_id(target)?;
    let req: VoteRequest = if body.is_empty() {
        VoteRequest::default()
    } else {
        parse_json(body)?
    };

    let outcome = state
        .voting
        .cast_vote(identity.user_id, kind, target, req.direction()?)
        .await?;

    Ok(json_response(StatusCode::OK, &outcome))
}

pub async fn handle_accept(
    state: &AppState,
    headers: &HeaderMap,
    answer: &str,
) -> Result<Response<FullBody>> {
    let identity = authenticate(state, headers).await?;
    let answer = parse_id(answer)?;

    let outcome = state.voting.accept_answer(identity.user_id, answer).await?;

    Ok(json_response(
        StatusCode::OK,
        &AcceptResponse {
            success: true,
            question_id: outcome.question_id.to_hex(),
            answer_id: outcome.answer_id.to_hex(),
            changed: outcome.changed,
            demoted: outcome.demoted.map(|id| id.to_hex()),
        },
    ))
}
