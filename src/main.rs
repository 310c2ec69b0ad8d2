use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::{routing::get, Router};
use clap::Parser;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use ginger::boot::{boot, App, Cli};
use ginger::database::manager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so JWT_SECRET and MYSQL_* overrides are picked up.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let app = Arc::new(boot(&cli).await?);
    tracing::info!("Starting ginger in {:?} mode", app.config.environment);

    let bind_addr = format!("0.0.0.0:{}", app.config.base.listen);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, router(app.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Ok(pool) = app.gateway.handle().get() {
        manager::close(pool).await;
    }
    tracing::info!("shutdown complete");
    Ok(())
}

fn router(app: Arc<App>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn root(State(app): State<Arc<App>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "ginger",
            "version": env!("CARGO_PKG_VERSION"),
            "env": app.config.environment.as_str(),
        }
    }))
}

async fn health(State(app): State<Arc<App>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match app.gateway.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
