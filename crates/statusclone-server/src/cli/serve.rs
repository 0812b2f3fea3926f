//! `statusclone serve`: run the HTTP API in the foreground.

use crate::config::ServerConfig;
use crate::rest;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub async fn run(config: &ServerConfig) -> Result<()> {
    info!("starting statusclone v{}", env!("CARGO_PKG_VERSION"));
    let state = config.build_state().await?;
    rest::start(config.listen, Arc::new(state)).await
}
