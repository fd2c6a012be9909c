//! Inbound mailbox watching via IMAP
//!
//! Keeps an IMAP session on the configured folder and reacts to new-message
//! notifications through IDLE. Each new message is fetched, reduced to a flat
//! [`InboundEmailEvent`] and forwarded to the webhook on its own task, so a
//! slow or failing webhook never stalls the mailbox loop.
//!
//! The blocking IMAP session runs on a dedicated thread via `spawn_blocking`;
//! events cross back to the async side through a channel. A lost session is
//! reopened with exponential backoff up to a bounded number of attempts.

use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use mailparse::{MailAddr, MailHeaderMap};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use mb_core::EmailConfig;

use crate::error::{EmailError, Result};
use crate::forward::{InboundEmailEvent, WebhookForwarder};

type ImapSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

const INITIAL_RETRY_BACKOFF: Duration = Duration::from_secs(5);
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(300);
const MAX_CONNECT_ATTEMPTS: u32 = 8;

/// A session that survived this long counts as recovered and resets the
/// reconnect budget.
const SESSION_STABLE_AFTER: Duration = Duration::from_secs(60);

/// Inbound mailbox watcher
pub struct InboundWatcher {
    config: EmailConfig,
    forwarder: WebhookForwarder,
}

impl InboundWatcher {
    pub fn new(config: EmailConfig, forwarder: WebhookForwarder) -> Self {
        Self { config, forwarder }
    }

    /// Run the watcher until the connection is lost beyond recovery.
    ///
    /// Forward outcomes are consumed only by the logger: the mailbox loop
    /// proceeds regardless of webhook delivery.
    pub async fn run(&self) -> Result<()> {
        let (event_tx, event_rx) = mpsc::channel::<InboundEmailEvent>(64);

        let forward_task = tokio::spawn(forward_events(event_rx, self.forwarder.clone()));

        let mut backoff = INITIAL_RETRY_BACKOFF;
        let mut attempts = 0u32;

        let result = loop {
            let config = self.config.clone();
            let tx = event_tx.clone();
            let started = Instant::now();

            let session_result =
                tokio::task::spawn_blocking(move || watch_session(&config, tx)).await;

            let err = match session_result {
                Ok(Ok(())) => break Ok(()), // receiver dropped, shutting down
                Ok(Err(e)) => e,
                Err(e) => EmailError::ImapConnection(format!("watcher task panicked: {}", e)),
            };

            if started.elapsed() >= SESSION_STABLE_AFTER {
                backoff = INITIAL_RETRY_BACKOFF;
                attempts = 0;
            }

            attempts += 1;
            if attempts >= MAX_CONNECT_ATTEMPTS {
                error!("Mailbox watcher giving up after {} attempts: {}", attempts, err);
                break Err(err);
            }

            warn!("Mailbox session ended: {}; reconnecting in {:?}", err, backoff);
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_RETRY_BACKOFF);
        };

        drop(event_tx);
        let _ = forward_task.await;

        result
    }
}

/// Drain inbound events, forwarding each on its own task.
///
/// Delivery outcomes are consumed only by the logger; a failing webhook
/// never stops the loop from draining subsequent events.
async fn forward_events(mut events: mpsc::Receiver<InboundEmailEvent>, forwarder: WebhookForwarder) {
    while let Some(event) = events.recv().await {
        let forwarder = forwarder.clone();
        tokio::spawn(async move {
            if let Err(e) = forwarder.forward(&event).await {
                warn!("Webhook error: {}", e);
            }
        });
    }
}

/// One blocking IMAP session: connect, select the folder, then IDLE until
/// the message count grows. Returns Ok only when the event receiver is gone.
fn watch_session(config: &EmailConfig, events: mpsc::Sender<InboundEmailEvent>) -> Result<()> {
    let mut session = open_session(config)?;

    let mailbox = session.select(&config.folder).map_err(|e| {
        EmailError::ImapConnection(format!("failed to select folder '{}': {}", config.folder, e))
    })?;
    let mut last_exists = mailbox.exists;

    info!(
        "Watching folder '{}' ({} messages)",
        config.folder, last_exists
    );

    loop {
        session
            .idle()
            .and_then(|idle| idle.wait_keepalive())
            .map_err(|e| EmailError::ImapConnection(format!("IDLE failed: {}", e)))?;

        // Re-select to learn the message count after the wakeup.
        let mailbox = session.select(&config.folder).map_err(|e| {
            EmailError::ImapConnection(format!(
                "failed to reselect folder '{}': {}",
                config.folder, e
            ))
        })?;

        if mailbox.exists > last_exists {
            let event = fetch_latest(&mut session)?;
            info!("New email: {}", event.subject);

            if events.blocking_send(event).is_err() {
                return Ok(());
            }
        }
        last_exists = mailbox.exists;
    }
}

fn open_session(config: &EmailConfig) -> Result<ImapSession> {
    let tls = native_tls::TlsConnector::builder()
        .build()
        .map_err(|e| EmailError::ImapConnection(format!("failed to build TLS connector: {}", e)))?;

    let client = imap::connect(
        (config.imap_host.as_str(), config.imap_port),
        config.imap_host.as_str(),
        &tls,
    )
    .map_err(|e| {
        EmailError::ImapConnection(format!(
            "failed to connect to {}:{}: {}",
            config.imap_host, config.imap_port, e
        ))
    })?;

    client
        .login(config.address.as_str(), config.password.as_str())
        .map_err(|(e, _)| EmailError::ImapConnection(format!("login failed: {}", e)))
}

/// Fetch the most recently arrived message in the selected folder.
///
/// A burst of N arrivals surfaces as N separate wakeups, each fetching `*`.
fn fetch_latest(session: &mut ImapSession) -> Result<InboundEmailEvent> {
    let fetches = session
        .fetch("*", "RFC822")
        .map_err(|e| EmailError::Fetch(format!("failed to fetch newest message: {}", e)))?;

    let fetch = fetches
        .iter()
        .next()
        .ok_or_else(|| EmailError::Fetch("fetch returned no messages".to_string()))?;
    let raw = fetch
        .body()
        .ok_or_else(|| EmailError::Fetch("fetch returned no body".to_string()))?;

    event_from_raw(raw)
}

/// Reduce a raw RFC 822 message to the flat webhook record.
///
/// Multi-recipient address lists are reduced to their first entry. This is an
/// intentional scope limit of the bridge, not full envelope fidelity.
fn event_from_raw(raw: &[u8]) -> Result<InboundEmailEvent> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| EmailError::Parsing(e.to_string()))?;
    let headers = parsed.headers.as_slice();

    let from = headers
        .get_first_value("From")
        .and_then(|value| first_address(&value))
        .unwrap_or_default();
    let to = headers
        .get_first_value("To")
        .and_then(|value| first_address(&value))
        .unwrap_or_default();
    let subject = headers.get_first_value("Subject").unwrap_or_default();
    let date = headers
        .get_first_value("Date")
        .and_then(|value| mailparse::dateparse(&value).ok())
        .and_then(|timestamp| Utc.timestamp_opt(timestamp, 0).single())
        .unwrap_or_else(Utc::now);

    Ok(InboundEmailEvent {
        from,
        to,
        subject,
        date,
        raw: String::from_utf8_lossy(raw).into_owned(),
    })
}

/// First address of an address-list header value
fn first_address(value: &str) -> Option<String> {
    let addresses = mailparse::addrparse(value).ok()?.into_inner();
    for address in addresses {
        match address {
            MailAddr::Single(single) => return Some(single.addr),
            MailAddr::Group(group) => {
                if let Some(single) = group.addrs.into_iter().next() {
                    return Some(single.addr);
                }
            }
        }
    }
    None
}
