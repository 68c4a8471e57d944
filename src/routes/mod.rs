//! HTTP routes for Qanda
//!
//! `dispatch` maps a method and path to a handler. Handlers return
//! `Result<Response>`; errors become `{ "error", "code" }` JSON bodies with
//! the status from `QandaError::status_code`.

pub mod admin;
pub mod content;
pub mod health;
pub mod users;
pub mod votes;

pub use health::health_check;

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{resolve_identity, Identity};
use crate::db::schemas::TargetKind;
use crate::server::AppState;
use crate::types::{QandaError, Result};

pub type FullBody = Full<Bytes>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Route a request. Never fails: errors are rendered as JSON.
pub async fn dispatch(
    state: &AppState,
    method: Method,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<FullBody> {
    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let result = match (method, segments.as_slice()) {
        (Method::OPTIONS, _) => Ok(preflight_response()),

        (Method::GET, ["health"]) | (Method::GET, ["healthz"]) => Ok(health_check(state)),

        // Questions
        (Method::GET, ["api", "questions"]) => content::list_questions(state, query).await,
        (Method::POST, ["api", "questions"]) => {
            content::create_question(state, headers, &body).await
        }
        (Method::GET, ["api", "questions", id]) => content::get_question(state, id).await,
        (Method::POST, ["api", "questions", id, "answers"]) => {
            content::create_answer(state, headers, id, &body).await
        }

        // Votes and acceptance
        (Method::POST, ["api", "questions", id, "vote"]) => {
            votes::handle_vote(state, headers, TargetKind::Question, id, &body).await
        }
        (Method::POST, ["api", "answers", id, "vote"]) => {
            votes::handle_vote(state, headers, TargetKind::Answer, id, &body).await
        }
        (Method::PATCH, ["api", "answers", id, "accept"]) => {
            votes::handle_accept(state, headers, id).await
        }

        (Method::GET, ["api", "users", id]) => users::get_user(state, id).await,

        (Method::POST, ["api", "admin", "reconcile", kind, id]) => {
            admin::handle_reconcile(state, headers, kind, id).await
        }

        _ => Err(QandaError::NotFound(format!("No route for {}", path))),
    };

    let response = result.unwrap_or_else(error_body);
    with_cors(state, response)
}

/// Render an error with the CORS header attached
pub fn error_response(state: &AppState, err: QandaError) -> Response<FullBody> {
    with_cors(state, error_body(err))
}

fn error_body(err: QandaError) -> Response<FullBody> {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(code = err.error_code(), "Request failed: {}", err);
    }
    json_response(
        status,
        &ErrorResponse {
            error: err.to_string(),
            code: err.error_code(),
        },
    )
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Authorization, Content-Type"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PATCH, OPTIONS"),
    );
    response
}

fn with_cors(state: &AppState, mut response: Response<FullBody>) -> Response<FullBody> {
    let origin = HeaderValue::from_str(&state.args.cors_origin)
        .unwrap_or_else(|_| HeaderValue::from_static("*"));
    response
        .headers_mut()
        .insert("Access-Control-Allow-Origin", origin);
    response
}

// =============================================================================
// Request helpers
// =============================================================================

pub(crate) fn parse_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| QandaError::BadRequest(format!("Invalid id '{}'", raw)))
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return Err(QandaError::BadRequest("Request body is required".into()));
    }
    Ok(serde_json::from_slice(body)?)
}

/// Resolve the caller and make sure they have a user record
pub(crate) async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity> {
    let auth_header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let identity = resolve_identity(&state.jwt, auth_header)?;
    state.store.ensure_user(&identity).await?;
    Ok(identity)
}
