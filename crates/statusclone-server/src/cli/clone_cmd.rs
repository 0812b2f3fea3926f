//! `statusclone clone <url>`: run one clone and print the result.

use crate::cli::output::{self, ProgressLog};
use crate::config::ServerConfig;
use anyhow::{bail, Result};
use futures::StreamExt;
use statusclone::CloneEvent;
use std::sync::Arc;

/// Run the clone command. An `error` event becomes an `Err`.
pub async fn run(config: &ServerConfig, url: &str, quiet: bool, compact: bool) -> Result<()> {
    let state = config.build_state().await?;
    let mut events = Arc::clone(&state.pipeline).clone_page(url);
    let progress = ProgressLog::new(quiet);

    let mut terminal = None;
    while let Some(envelope) = events.next().await {
        match envelope.event {
            CloneEvent::Progress { message } => progress.line(&message),
            event => {
                terminal = Some(event);
                break;
            }
        }
    }
    progress.finish();

    match terminal {
        Some(CloneEvent::Result { data, .. }) => output::print_json(&data, compact),
        Some(CloneEvent::Error {
            message,
            code,
            retryable,
        }) => {
            let hint = if retryable { ", retryable" } else { "" };
            bail!("{message} ({code}{hint})")
        }
        _ => bail!("clone ended without a result"),
    }
}
