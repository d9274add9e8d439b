//! Echo Bot Example
//!
//! Subscribes its commands once the Bot API handshake succeeds:
//!
//! ```text
//! /start   - greeting with an inline "Status" button
//! /status  - acknowledges the command
//! status   - (button press) answers the callback query
//! *        - echoes any other text back
//! ```
//!
//! # Usage
//!
//! ```bash
//! TGBRIDGE_TELEGRAM__TOKEN=123:abc TGBRIDGE_TELEGRAM__ACL='[42]' \
//!     cargo run --package echo-bot
//! ```

use std::path::PathBuf;
use std::sync::Once;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tgbridge::prelude::*;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "echo-bot", about = "A simple tgbridge echo bot")]
struct Cli {
    /// Configuration file to load instead of searching for `tgbridge.toml`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (overrides `TGBRIDGE_PROFILE`).
    #[arg(short, long)]
    profile: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

fn start_handler(update: &UpdateRecord, _: &UserData) -> HandlerResult {
    info!(chat_id = update.chat_id, "\"/start\" handler");
    tgbridge::send_json(&json!({
        "chat_id": update.chat_id,
        "text": "Received command \"/start\"",
        "reply_markup": Correlator::inline_keyboard(&[("Status", "status")]),
    }))?;
    Ok(())
}

fn status_handler(update: &UpdateRecord, _: &UserData) -> HandlerResult {
    info!(chat_id = update.chat_id, "\"/status\" handler");
    tgbridge::send_message_with(
        update.chat_id,
        "Received command \"/status\"",
        UserData::none(),
        |response, _| {
            if let Some(message_id) = response.message_id() {
                info!(message_id, "Status reply delivered");
            } else {
                let error = response.error_description().unwrap_or_default();
                warn!(error, "Status reply failed");
            }
        },
    )?;
    Ok(())
}

fn button_handler(update: &UpdateRecord, _: &UserData) -> HandlerResult {
    if update.kind != CALLBACK_QUERY {
        return Ok(());
    }
    if let Some(callback_id) = &update.callback_id {
        tgbridge::answer_callback_query(callback_id.as_str(), Some("All systems nominal"), false)?;
    }
    Ok(())
}

fn echo_handler(update: &UpdateRecord, _: &UserData) -> HandlerResult {
    let Some(text) = update.text() else {
        return Ok(());
    };
    if update.kind != MESSAGE || text.starts_with('/') || !update.is_supported() {
        return Ok(());
    }
    info!(chat_id = update.chat_id, "\"*\" handler");
    tgbridge::send_message(update.chat_id, text)?;
    Ok(())
}

fn register_commands() -> Result<(), FacadeError> {
    tgbridge::subscribe("/start", start_handler, UserData::none())?;
    tgbridge::subscribe("/status", status_handler, UserData::none())?;
    tgbridge::subscribe("status", button_handler, UserData::none())?;
    tgbridge::subscribe("*", echo_handler, UserData::none())?;
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = BridgeRuntime::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = cli.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;
    tgbridge::install(&runtime)?;

    // CONNECTED fires again after every reconnect; subscribe only once.
    static SUBSCRIBED: Once = Once::new();
    tgbridge::on_event(
        *CONNECTED,
        |_, _| {
            SUBSCRIBED.call_once(|| {
                if let Err(e) = register_commands() {
                    warn!(error = %e, "Failed to register commands");
                }
            });
        },
        UserData::none(),
    )?;
    tgbridge::on_event(
        *DISCONNECTED,
        |_, _| warn!("Bot API connection lost"),
        UserData::none(),
    )?;

    runtime.run().await?;
    Ok(())
}
