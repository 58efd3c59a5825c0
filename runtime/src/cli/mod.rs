// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the `vidgrab` binary.

pub mod doctor;
pub mod extract_cmd;
pub mod output;
pub mod serve;

use crate::config::Config;
use crate::extractor::Extractor;
use crate::renderer::chromium::ChromiumLauncher;
use crate::renderer::{BrowserLauncher, NoopLauncher};
use std::sync::Arc;
use tracing::{info, warn};

/// Pick the Chromium launcher, or a no-op one when no binary is found.
pub fn launcher(config: &Config) -> Arc<dyn BrowserLauncher> {
    match ChromiumLauncher::discover(config.browser.chromium_path.as_deref()) {
        Ok(launcher) => {
            info!("using Chromium at {}", launcher.executable().display());
            Arc::new(launcher)
        }
        Err(e) => {
            warn!("{e:#}");
            warn!("every extraction will return an empty result");
            Arc::new(NoopLauncher::new(format!("{e:#}")))
        }
    }
}

pub fn extractor(config: &Config) -> Arc<Extractor> {
    Arc::new(Extractor::new(launcher(config), config.extract.clone()))
}
