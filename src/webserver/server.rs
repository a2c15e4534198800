/// Axum webserver implementation
///
/// Operator-facing only: binds to 127.0.0.1 on the configured port and
/// serves queue/job statistics and service health. Shuts down gracefully
/// when the shared shutdown notifier fires.
use crate::config::with_config;
use crate::logger::{self, LogTag};
use crate::webserver::routes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower_http::compression::CompressionLayer;

pub(crate) const DEFAULT_HOST: &str = "127.0.0.1";

/// Start the webserver; returns the serving task handle
pub async fn start_webserver(shutdown: Arc<Notify>) -> Result<JoinHandle<()>, String> {
    let port = with_config(|cfg| cfg.api_port);
    let addr: SocketAddr = format!("{}:{}", DEFAULT_HOST, port)
        .parse()
        .map_err(|e| format!("Invalid listen address: {}", e))?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;

    let app = routes::build_router().layer(CompressionLayer::new());

    logger::info(
        LogTag::Webserver,
        &format!("Operator API listening on http://{}", addr),
    );

    let handle = tokio::spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            shutdown.notified().await;
        });
        if let Err(e) = serve.await {
            logger::error(LogTag::Webserver, &format!("Webserver error: {}", e));
        }
        logger::info(LogTag::Webserver, "Webserver stopped");
    });
    Ok(handle)
}
