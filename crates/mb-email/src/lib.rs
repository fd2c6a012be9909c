//! mb-email: email bridging for mail-bridge
//!
//! This crate provides the inbound mailbox watcher, the webhook forwarder
//! and threaded reply sending over SMTP.

pub mod error;
pub mod forward;
pub mod send;
pub mod threading;
pub mod watch;

pub use error::{EmailError, Result};
pub use forward::{ForwardError, InboundEmailEvent, WebhookForwarder};
pub use send::{MailTransport, OutboundMessage, ReplyRequest, ReplySender, SendAck, SmtpMailer};
pub use threading::{ThreadingHeaders, threading_headers};
pub use watch::InboundWatcher;
