//! mb-api: HTTP surface for mail-bridge
//!
//! Exposes the reply sender over a single POST route.
//! Built with axum for async HTTP handling.

pub mod handlers;
pub mod routes;
pub mod server;

pub use server::{AppState, start_server};
