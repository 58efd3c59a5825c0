// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Browser abstraction for extraction sessions.
//!
//! A [`BrowserLauncher`] starts one isolated browser process per call and
//! hands back a [`BrowserSession`]; the session opens [`PageContext`]s.
//! The production backend is Chromium via chromiumoxide. Tests drive the
//! extractor through [`scripted::ScriptedLauncher`].

pub mod chromium;
pub mod idle;
pub mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken until the network went idle, in milliseconds.
    pub load_time_ms: u64,
}

/// Starts browser processes.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a fresh, isolated browser process.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A running browser process. Owned by exactly one extraction.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a new browsing context (tab).
    async fn new_page(&self) -> Result<Box<dyn PageContext>>;
    /// Terminate the browser process.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A single tab.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Override the browser identification string for this tab.
    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Stream of URLs of every network response the tab receives from now on.
    ///
    /// Must be called before [`navigate`](Self::navigate) to see responses
    /// fired during page load.
    async fn response_urls(&self) -> Result<BoxStream<'static, String>>;

    /// Navigate and wait until the network has been quiet for `idle_window`.
    ///
    /// This does not time out on its own; callers bound it.
    async fn navigate(&mut self, url: &str, idle_window: Duration) -> Result<NavigationResult>;

    /// Wait up to `wait` for an element matching `selector`, then click it.
    async fn click(&self, selector: &str, wait: Duration) -> Result<()>;

    /// Serialized markup of the rendered document.
    async fn get_html(&self) -> Result<String>;

    /// Close this tab.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Launcher used when no Chromium binary is available.
///
/// The server still starts and answers health checks; every extraction
/// reports a launch failure and so resolves to an empty result.
pub struct NoopLauncher {
    reason: String,
}

impl NoopLauncher {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for NoopLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Err(anyhow::anyhow!("browser not available: {}", self.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_launcher_fails() {
        let launcher = NoopLauncher::new("Chromium not found");
        let err = launcher.launch().await.err().expect("launch should fail");
        assert!(err.to_string().contains("Chromium not found"));
    }
}
