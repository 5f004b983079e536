use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fcm_client::{CancellationToken, FCMClient, FCMError, FcmSettings, Message, Response};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Send one FCM message described by a JSON file (or stdin)
///
/// Credentials come from `FCM_API_KEY` or `FCM_CREDENTIALS_PATH`.
#[derive(Parser, Debug)]
#[command(name = "fcm-send", version, about)]
struct Args {
    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Total attempts for the direct HTTP transport (defaults to FCM_MAX_ATTEMPTS)
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Message JSON in the legacy FCM format; reads stdin when omitted
    #[arg(value_name = "MESSAGE_FILE")]
    message_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    let settings = FcmSettings::from_env().context("Failed to read FCM_* settings")?;
    let client = FCMClient::from_settings(&settings).context("Failed to create FCM client")?;
    let message = read_message(args.message_file.as_ref())?;
    let attempts = args.retries.unwrap_or(settings.max_attempts);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling send");
            trigger.cancel();
        }
    });

    tracing::info!(transport = client.transport(), attempts, "Sending message");
    let outcome = if attempts > 1 && client.transport() == "http" {
        client
            .send_with_retry_and_cancellation(&message, attempts, &cancel)
            .await
    } else {
        client.send_with_cancellation(&message, &cancel).await
    };

    report(outcome)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the response
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}

fn read_message(path: Option<&PathBuf>) -> Result<Message> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read message from stdin")?;
            raw
        }
    };
    parse_message(&raw)
}

fn parse_message(raw: &str) -> Result<Message> {
    serde_json::from_str(raw).context("Message is not valid FCM JSON")
}

/// Print the response to stdout; provider failures print what was reported
/// before the error is returned.
fn report(outcome: Result<Response, FCMError>) -> Result<()> {
    match outcome {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) => {
            if let Some(response) = err.response() {
                println!("{}", serde_json::to_string_pretty(response)?);
            }
            Err(err).context("Send failed")
        }
    }
}
