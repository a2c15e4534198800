/// GET /status - uptime, version, service health
use crate::global::{self, STARTUP_TIME};
use crate::services;
use crate::version::VERSION;
use axum::Json;
use serde_json::json;

pub async fn get_status() -> Json<serde_json::Value> {
    let uptime_seconds = (chrono::Utc::now() - *STARTUP_TIME).num_seconds().max(0);
    let health = services::health_snapshot().await;
    let health_json: serde_json::Map<String, serde_json::Value> = health
        .into_iter()
        .map(|(name, health)| (name.to_string(), json!(health.to_string())))
        .collect();

    Json(json!({
        "version": VERSION,
        "uptime_seconds": uptime_seconds,
        "core_ready": global::are_core_services_ready(),
        "services": health_json,
    }))
}
