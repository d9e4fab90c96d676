//! API module - HTTP handlers and routes

pub mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::BridgeState;

pub fn routes() -> Router<BridgeState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Bridge status
        .route("/api/status", get(handlers::get_status))
        .route("/api/poll", post(handlers::trigger_poll))
        // Device snapshots
        .route("/api/devices", get(handlers::list_devices))
        .route("/api/devices/:id", get(handlers::get_device))
        .route("/api/devices/:id/stats", get(handlers::get_stats))
        .route("/api/devices/:id/attributes", get(handlers::get_attributes))
        .route("/api/devices/:id/schedule", get(handlers::get_schedule))
        // Feeding
        .route("/api/devices/:id/portions", get(handlers::get_portions))
        .route("/api/devices/:id/portions", put(handlers::set_portions))
        .route("/api/devices/:id/feed", post(handlers::feed_device))
        .route("/api/feed", post(handlers::feed_dispatch))
}
