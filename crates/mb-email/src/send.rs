//! Threaded reply sending via SMTP
//!
//! The sender validates the request, derives threading headers and hands a
//! fully assembled [`OutboundMessage`] to a [`MailTransport`]. One lettre
//! transport is built at startup and shared across requests.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use tracing::{error, info};

use mb_core::EmailConfig;

use crate::error::{EmailError, Result};
use crate::threading::{ThreadingHeaders, threading_headers};

/// Reply request as received from the HTTP surface.
///
/// String fields default to empty when absent so that presence validation
/// happens in [`ReplySender::send`], not in the JSON layer; an explicit empty
/// string and a missing field are equally invalid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub references: Option<String>,
}

/// Fully assembled outbound reply, consumed exactly once by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub headers: ThreadingHeaders,
}

/// Acknowledgement returned on a successful send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAck {
    pub status: &'static str,
}

/// Transport seam for outbound mail.
///
/// Production uses [`SmtpMailer`]; tests substitute a recording transport.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: OutboundMessage) -> Result<()>;
}

/// SMTP transport backed by a shared lettre connection pool
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build a STARTTLS relay transport for the configured account
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| EmailError::SmtpSend(format!("invalid SMTP host: {}", e)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.address.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, message: OutboundMessage) -> Result<()> {
        let mut builder = Message::builder()
            .from(message
                .from
                .parse()
                .map_err(|_| EmailError::InvalidAddress(message.from.clone()))?)
            .to(message
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(message.to.clone()))?)
            .subject(message.subject);

        if let Some(in_reply_to) = message.headers.in_reply_to {
            builder = builder.in_reply_to(in_reply_to);
        }
        if let Some(references) = message.headers.references {
            builder = builder.references(references);
        }

        let email = builder
            .body(message.body)
            .map_err(|e| EmailError::SmtpSend(format!("failed to build message: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| EmailError::SmtpSend(e.to_string()))?;

        Ok(())
    }
}

/// Reply sender
pub struct ReplySender {
    from: String,
    transport: Arc<dyn MailTransport>,
}

impl ReplySender {
    /// Create a sender with a lettre SMTP transport for the configured account
    pub fn new(config: &EmailConfig) -> Result<Self> {
        Ok(Self {
            from: config.address.clone(),
            transport: Arc::new(SmtpMailer::new(config)?),
        })
    }

    /// Create a sender over an explicit transport
    pub fn with_transport(from: impl Into<String>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            from: from.into(),
            transport,
        }
    }

    /// Validate the request, derive threading headers and send the reply.
    ///
    /// Missing `to`/`subject`/`message` fails before any network activity.
    /// Sending is not idempotent: the same request twice sends two emails.
    pub async fn send(&self, req: &ReplyRequest) -> Result<SendAck> {
        if req.to.is_empty() || req.subject.is_empty() || req.message.is_empty() {
            return Err(EmailError::MissingFields);
        }

        let headers = threading_headers(req.message_id.as_deref(), req.references.as_deref());
        let message = OutboundMessage {
            from: self.from.clone(),
            to: req.to.clone(),
            subject: req.subject.clone(),
            body: req.message.clone(),
            headers,
        };

        info!("Sending reply to {}", message.to);

        match self.transport.deliver(message).await {
            Ok(()) => Ok(SendAck { status: "sent" }),
            Err(e) => {
                error!("Send error: {}", e);
                Err(e)
            }
        }
    }
}
