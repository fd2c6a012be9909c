//! Error types for mb-email

use thiserror::Error;

/// mb-email error type
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Missing fields")]
    MissingFields,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("SMTP send error: {0}")]
    SmtpSend(String),

    #[error("IMAP connection error: {0}")]
    ImapConnection(String),

    #[error("Message fetch error: {0}")]
    Fetch(String),

    #[error("Email parsing error: {0}")]
    Parsing(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EmailError>;
