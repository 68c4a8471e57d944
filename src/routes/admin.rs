//! Admin endpoints
//!
//! POST /api/admin/reconcile/{questions|answers}/{id} recomputes a cached
//! vote count from the ledger and repairs it. Requires the ADMIN role.

use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::db::schemas::TargetKind;
use crate::routes::{authenticate, json_response, parse_id, FullBody};
use crate::server::AppState;
use crate::types::{QandaError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub kind: TargetKind,
    pub target_id: String,
    pub cached: i64,
    pub actual: i64,
    pub repaired: bool,
}

pub async fn handle_reconcile(
    state: &AppState,
    headers: &HeaderMap,
    kind: &str,
    target: &str,
) -> Result<Response<FullBody>> {
    let identity = authenticate(state, headers).await?;
    if !identity.is_admin() {
        return Err(QandaError::Forbidden("Admin role required".into()));
    }

    let kind = TargetKind::from_collection_segment(kind)?;
    let target = parse_id(target)?;

    let report = state.voting.reconcile(kind, target).await?;
    tracing::info!(
        admin = %identity.user_id,
        kind = %kind,
        target = %target,
        repaired = report.repaired,
        "Reconciliation requested"
    );

    Ok(json_response(
        StatusCode::OK,
        &ReconcileResponse {
            kind: report.kind,
            target_id: report.target_id.to_hex(),
            cached: report.cached,
            actual: report.actual,
            repaired: report.repaired,
        },
    ))
}
