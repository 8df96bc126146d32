//! # sagitta
//!
//! Terminal chat client: every stdin line becomes a chat query, every reply
//! is printed, connection notices go to stderr. Exits on EOF or Ctrl-C.

#![deny(unsafe_code)]

mod options;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sagitta_chat::{ChatSocket, ConnectionBanner};
use sagitta_settings::{load_settings_from_path, settings_path};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::options::{Cli, Plan, log_level};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.settings.clone().unwrap_or_else(settings_path);
    let settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    sagitta_core::logging::init_subscriber(&log_level(&cli, &settings), settings.logging.format);
    let plan = Plan::resolve(&cli, &settings);
    info!(
        base_url = %plan.base_url,
        session_id = %plan.session.session_id,
        session_type = %plan.session.session_type,
        "starting chat"
    );

    let assistant = plan.session.assistant_name.clone();
    let fixed_token = plan.token;
    let tokens = move || {
        fixed_token
            .clone()
            .unwrap_or_else(|| Uuid::now_v7().to_string())
    };
    let socket = Arc::new(
        ChatSocket::builder(plan.base_url, tokens, plan.session)
            .config(plan.socket)
            .build(),
    );

    let _replies = socket.subscribe_to_messages(move |reply| {
        println!("{assistant}> {}", reply.response);
    });
    let banners = spawn_banner_watch(Arc::clone(&socket));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("stdin closed");
                    break;
                };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if !socket.send_message(text) {
                    eprintln!("[not connected, message dropped]");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    banners.abort();
    socket.close().await;
    info!("chat closed");
    Ok(())
}

/// Print a notice to stderr whenever the connection banner changes.
fn spawn_banner_watch(socket: Arc<ChatSocket>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut states = socket.client().watch_state();
        let mut shown: Option<ConnectionBanner> = None;
        loop {
            let banner = socket.banner();
            if banner != shown {
                match banner {
                    Some(b) => eprintln!("[{b}]"),
                    None => eprintln!("[connected]"),
                }
                shown = banner;
            }
            if states.changed().await.is_err() {
                break;
            }
        }
    })
}
