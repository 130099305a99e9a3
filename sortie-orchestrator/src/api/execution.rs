//! Execution API Handlers
//!
//! HTTP endpoints for submitting and inspecting executions.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sortie_core::domain::execution::{ExecutionRecord, ExecutionStatus, PrincipalId};
use sortie_core::dto::execution::{ExecutionPage, ExecutionRequest, ExecutionStats};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::principal::Principal;
use crate::service::ExecutionTracker;
use crate::service::tracker::DEFAULT_PAGE_LIMIT;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LiveOutputResponse {
    pub id: Uuid,
    pub status: ExecutionStatus,
    pub lines: Vec<String>,
}

/// POST /executions
/// Submit an adhoc execution; returns the pending record
pub async fn create_execution(
    State(tracker): State<ExecutionTracker>,
    Principal(user_id): Principal,
    Json(req): Json<ExecutionRequest>,
) -> ApiResult<(StatusCode, Json<ExecutionRecord>)> {
    let record = tracker.submit(req, user_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /executions
/// List the caller's executions, newest first
pub async fn list_executions(
    State(tracker): State<ExecutionTracker>,
    Principal(user_id): Principal,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<ExecutionPage>> {
    let page = tracker
        .list(
            user_id,
            page.offset.unwrap_or(0),
            page.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;

    Ok(Json(page))
}

/// GET /executions/stats
pub async fn execution_stats(
    State(tracker): State<ExecutionTracker>,
    Principal(user_id): Principal,
) -> ApiResult<Json<ExecutionStats>> {
    Ok(Json(tracker.stats(user_id).await?))
}

/// GET /executions/{id}
pub async fn get_execution(
    State(tracker): State<ExecutionTracker>,
    Principal(user_id): Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ExecutionRecord>> {
    tracing::debug!("Getting execution: {}", id);
    Ok(Json(owned_execution(&tracker, user_id, id).await?))
}

/// GET /executions/{id}/live
/// Stdout captured so far; the stored output once the execution finished
pub async fn get_live_output(
    State(tracker): State<ExecutionTracker>,
    Principal(user_id): Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LiveOutputResponse>> {
    let record = owned_execution(&tracker, user_id, id).await?;

    let lines = match tracker.live_output(id) {
        Some(lines) => lines,
        None if record.status.is_terminal() && !record.output.is_empty() => {
            record.output.lines().map(str::to_string).collect()
        }
        None => Vec::new(),
    };

    Ok(Json(LiveOutputResponse {
        id,
        status: record.status,
        lines,
    }))
}

// Another principal's execution is reported as missing
async fn owned_execution(
    tracker: &ExecutionTracker,
    user_id: PrincipalId,
    id: Uuid,
) -> ApiResult<ExecutionRecord> {
    let record = tracker.get(id).await?;
    if record.user_id != user_id {
        return Err(ApiError::NotFound(format!("Execution {} not found", id)));
    }
    Ok(record)
}
