mod queue;
mod status;

use axum::routing::get;
use axum::Router;

/// Assemble the operator API router
pub fn build_router() -> Router {
    Router::new()
        .route("/status", get(status::get_status))
        .route("/queue/stats", get(queue::get_queue_stats))
        .route("/jobs/stats", get(queue::get_job_stats))
}
