// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! `vidgrab serve`: run the HTTP front end.

use crate::config::Config;
use crate::pool::ExtractionPool;
use crate::rest::{self, AppState};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub async fn run(config: &Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    info!("starting vidgrab v{}", env!("CARGO_PKG_VERSION"));
    info!(
        proxy_prefix = config.proxy_prefix(),
        max_concurrent = config.browser.max_concurrent,
        "extraction settings"
    );

    let pool = Arc::new(ExtractionPool::new(
        super::extractor(config),
        config.browser.max_concurrent,
    ));
    let state = Arc::new(AppState::new(pool, config));

    rest::serve(addr, state).await
}
