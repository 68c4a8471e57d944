//! Question and answer endpoints
//!
//! - GET  /api/questions?limit&skip
//! - POST /api/questions
//! - GET  /api/questions/{id}
//! - POST /api/questions/{id}/answers

use bson::{oid::ObjectId, DateTime};
use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{AnswerDoc, QuestionDoc};
use crate::routes::{authenticate, json_response, parse_id, parse_json, FullBody};
use crate::server::AppState;
use crate::types::{QandaError, Result};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAnswerRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub votes: i64,
    pub accepted_answer: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub id: String,
    pub question_id: String,
    pub author_id: String,
    pub body: String,
    pub votes: i64,
    pub is_accepted: bool,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: QuestionView,
    pub answers: Vec<AnswerView>,
}

#[derive(Debug, Serialize)]
pub struct QuestionList {
    pub questions: Vec<QuestionView>,
    pub limit: i64,
    pub skip: u64,
}

fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

fn timestamp(at: Option<DateTime>) -> Option<String> {
    at.and_then(|t| t.try_to_rfc3339_string().ok())
}

impl From<QuestionDoc> for QuestionView {
    fn from(q: QuestionDoc) -> Self {
        Self {
            id: hex(q._id),
            author_id: q.author_id.to_hex(),
            title: q.title,
            body: q.body,
            tags: q.tags,
            votes: q.votes,
            accepted_answer: q.accepted_answer.map(|id| id.to_hex()),
            created_at: timestamp(q.metadata.created_at),
        }
    }
}

impl From<AnswerDoc> for AnswerView {
    fn from(a: AnswerDoc) -> Self {
        Self {
            id: hex(a._id),
            question_id: a.question_id.to_hex(),
            author_id: a.author_id.to_hex(),
            body: a.body,
            votes: a.votes,
            is_accepted: a.is_accepted,
            created_at: timestamp(a.metadata.created_at),
        }
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(QandaError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub async fn list_questions(state: &AppState, query: Option<&str>) -> Result<Response<FullBody>> {
    let params: ListQuery = match query {
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| QandaError::BadRequest(format!("Invalid query: {}", e)))?,
        None => ListQuery::default(),
    };
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let skip = params.skip.unwrap_or(0);

    let questions = state.store.list_questions(limit, skip).await?;

    Ok(json_response(
        StatusCode::OK,
        &QuestionList {
            questions: questions.into_iter().map(QuestionView::from).collect(),
            limit,
            skip,
        },
    ))
}

pub async fn create_question(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response<FullBody>> {
    let identity = authenticate(state, headers).await?;
    let req: CreateQuestionRequest = parse_json(body)?;

    let title = required("title", &req.title)?;
    let text = required("body", &req.body)?;
    let tags = req
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let id = state
        .store
        .insert_question(QuestionDoc::new(identity.user_id, title, text, tags))
        .await?;
    let question = state
        .store
        .find_question(id)
        .await?
        .ok_or_else(|| QandaError::Internal(format!("question {} vanished after insert", id)))?;

    tracing::info!(author = %identity.user_id, question = %id, "Question created");
    Ok(json_response(StatusCode::CREATED, &QuestionView::from(question)))
}

pub async fn get_question(state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let id = parse_id(id)?;
    let question = state
        .store
        .find_question(id)
        .await?
        .ok_or_else(|| QandaError::NotFound(format!("question {} not found", id)))?;
    let answers = state.store.list_answers(id).await?;

    Ok(json_response(
        StatusCode::OK,
        &QuestionDetail {
            question: question.into(),
            answers: answers.into_iter().map(AnswerView::from).collect(),
        },
    ))
}

pub async fn create_answer(
    state: &AppState,
    headers: &HeaderMap,
    question_id: &str,
    body: &[u8],
) -> Result<Response<FullBody>> {
    let identity = authenticate(state, headers).await?;
    let question_id = parse_id(question_id)?;
    let req: CreateAnswerRequest = parse_json(body)?;
    let text = required("body", &req.body)?;

    if state.store.find_question(question_id).await?.is_none() {
        return Err(QandaError::NotFound(format!(
            "question {} not found",
            question_id
        )));
    }

    let id = state
        .store
        .insert_answer(AnswerDoc::new(question_id, identity.user_id, text))
        .await?;
    let answer = state
        .store
        .find_answer(id)
        .await?
        .ok_or_else(|| QandaError::Internal(format!("answer {} vanished after insert", id)))?;

    tracing::info!(author = %identity.user_id, question = %question_id, answer = %id, "Answer created");
    Ok(json_response(StatusCode::CREATED, &AnswerView::from(answer)))
}
