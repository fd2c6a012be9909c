//! mb-core: shared configuration and error types for mail-bridge

pub mod config;
pub mod error;

pub use config::{ApiConfig, Config, EmailConfig, WebhookConfig};
pub use error::{Error, Result};
