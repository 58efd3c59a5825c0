// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then a JSON config file, then
//! environment variables. CLI flags are applied last by `main`.

use crate::proxy::DEFAULT_PROXY_PREFIX;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Desktop Chrome identification string sent by the extraction browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// CSS selector used to find the player's play control.
pub const DEFAULT_PLAY_SELECTOR: &str = r#"[class*="play"]"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    /// Prefix every manifest URL is rewritten through.
    pub proxy_prefix: Option<String>,
    pub source: SourceConfig,
    pub extract: ExtractSettings,
    pub browser: BrowserSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// The player site extraction targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    /// Substring a POSTed URL must contain to be accepted.
    pub host_marker: String,
    /// Locator used by `vidgrab extract` when no URL is given.
    pub default_target: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://player.videasy.net".to_string(),
            host_marker: "player.videasy.net".to_string(),
            default_target: "https://player.videasy.net/movie/299534".to_string(),
        }
    }
}

/// Timings and heuristics for a single extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    pub navigation_timeout_ms: u64,
    pub idle_window_ms: u64,
    pub settle_delay_ms: u64,
    pub play_wait_ms: u64,
    pub play_delay_ms: u64,
    pub user_agent: String,
    pub play_selector: String,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            idle_window_ms: 500,
            settle_delay_ms: 3_000,
            play_wait_ms: 5_000,
            play_delay_ms: 8_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            play_selector: DEFAULT_PLAY_SELECTOR.to_string(),
        }
    }
}

impl ExtractSettings {
    /// All waits set to zero. Used by tests driving a mock browser.
    pub fn immediate() -> Self {
        Self {
            navigation_timeout_ms: 1_000,
            idle_window_ms: 0,
            settle_delay_ms: 0,
            play_wait_ms: 0,
            play_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(self.idle_window_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn play_wait(&self) -> Duration {
        Duration::from_millis(self.play_wait_ms)
    }

    pub fn play_delay(&self) -> Duration {
        Duration::from_millis(self.play_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub chromium_path: Option<PathBuf>,
    /// Upper bound on browser processes running at once.
    pub max_concurrent: usize,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chromium_path: None,
            max_concurrent: 2,
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, `VIDGRAB_CONFIG`, or the default
    /// path, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    /// Override fields from `PORT`, `VIDGRAB_PROXY_PREFIX`,
    /// `VIDGRAB_CHROMIUM_PATH` and `VIDGRAB_MAX_CONCURRENT`.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(port) = get("PORT") {
            match port.trim().parse() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("ignoring invalid PORT={port}"),
            }
        }
        if let Some(prefix) = get("VIDGRAB_PROXY_PREFIX").filter(|p| !p.trim().is_empty()) {
            self.proxy_prefix = Some(prefix.trim().to_string());
        }
        if let Some(path) = get("VIDGRAB_CHROMIUM_PATH").filter(|p| !p.trim().is_empty()) {
            self.browser.chromium_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(n) = get("VIDGRAB_MAX_CONCURRENT") {
            match n.trim().parse::<usize>() {
                Ok(v) if v > 0 => self.browser.max_concurrent = v,
                _ => warn!("ignoring invalid VIDGRAB_MAX_CONCURRENT={n}"),
            }
        }
    }

    pub fn proxy_prefix(&self) -> &str {
        self.proxy_prefix.as_deref().unwrap_or(DEFAULT_PROXY_PREFIX)
    }
}

pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("VIDGRAB_CONFIG") {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let default = default_config_path()?;
    default.exists().then_some(default)
}

/// `~/.vidgrab/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vidgrab").join("config.json"))
}
