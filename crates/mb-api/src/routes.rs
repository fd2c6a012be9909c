//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{health, send_reply};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Threaded reply endpoint
        .route("/send-reply", post(send_reply))
}
