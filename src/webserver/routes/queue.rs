/// Queue observability endpoints
///
/// GET /queue/stats - api_requests counts by status, recent completion
/// rate, estimated drain time
/// GET /jobs/stats  - analysis_jobs counts by task type and status
use crate::database;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

pub async fn get_queue_stats() -> Result<Json<serde_json::Value>, StatusCode> {
    let db = database::get_database().map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    let stats = db
        .api_queue_stats()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(json!(stats)))
}

pub async fn get_job_stats() -> Result<Json<serde_json::Value>, StatusCode> {
    let db = database::get_database().map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    let counts = db
        .job_counts()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(json!({ "by_task_type": counts })))
}
