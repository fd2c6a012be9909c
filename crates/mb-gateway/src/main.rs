//! mb-gateway: mail-bridge main binary
//!
//! Bridges a mailbox to an automation webhook and exposes an HTTP endpoint
//! for sending threaded replies.
//!
//! Usage:
//!   mail-bridge           - Start the bridge (mailbox watcher + HTTP API)
//!   mail-bridge --help    - Show help

use std::sync::Arc;

use mb_core::Config;
use mb_email::{InboundWatcher, ReplySender, WebhookForwarder};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Bridge mode (mailbox watcher + HTTP API)
    Bridge,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("mail-bridge {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Bridge => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting mail-bridge...");
    tracing::info!("Account: {}", config.email.address);

    run_bridge(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Bridge
}

/// Print help message
fn print_help() {
    println!("mail-bridge - email inbox to automation webhook bridge");
    println!();
    println!("Usage:");
    println!("  mail-bridge           Start the bridge (mailbox watcher + HTTP API)");
    println!("  mail-bridge --help    Show this help message");
    println!("  mail-bridge --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  EMAIL_ADDRESS        Account address (required)");
    println!("  EMAIL_PASSWORD       Account password (required)");
    println!("  WEBHOOK_URL          Webhook receiving inbound emails (required)");
    println!("  PORT                 HTTP API port (default: 3000)");
    println!("  IMAP_HOST            IMAP server (default: imap.gmail.com)");
    println!("  SMTP_HOST            SMTP server (default: smtp.gmail.com)");
    println!("  IMAP_FOLDER          Watched folder (default: INBOX)");
}

/// Run the bridge: mailbox watcher + HTTP API
async fn run_bridge(config: Config) -> anyhow::Result<()> {
    // One shared SMTP transport for all reply requests
    let sender = Arc::new(
        ReplySender::new(&config.email)
            .map_err(|e| anyhow::anyhow!("Failed to create reply sender: {}", e))?,
    );

    let mut service_handles = Vec::new();

    // Start mailbox watcher
    let watcher = InboundWatcher::new(
        config.email.clone(),
        WebhookForwarder::new(config.webhook.url.clone()),
    );
    let handle = tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            tracing::error!("Mailbox watcher error: {}", e);
        }
    });
    service_handles.push(handle);
    tracing::info!("Mailbox watcher started");

    // Start HTTP API server
    let api_port = config.api.port;
    let api_sender = Arc::clone(&sender);
    let handle = tokio::spawn(async move {
        if let Err(e) = mb_api::start_server(api_port, api_sender).await {
            tracing::error!("HTTP API error: {}", e);
        }
    });
    service_handles.push(handle);
    tracing::info!("HTTP API server started on port {}", api_port);

    tracing::info!("mail-bridge initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    for handle in service_handles {
        handle.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
