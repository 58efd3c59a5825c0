// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory browser that replays a fixed script.
//!
//! Lets the extractor, pool and HTTP layer be exercised without Chromium.
//! Every launch opens the same [`PageScript`]; [`ScriptedStats`] records
//! launches, closes and navigations for assertions.

use super::{BrowserLauncher, BrowserSession, NavigationResult, PageContext};
use crate::error::ExtractError;
use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the scripted navigation ends.
#[derive(Debug, Clone, Default)]
pub enum NavigationScript {
    #[default]
    Load,
    Fail(String),
    /// Report a timeout after emitting the load-time responses.
    Timeout,
    /// Never finish; the caller's timeout has to fire.
    Hang,
}

/// What a scripted page does.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    /// Response URLs emitted while the page loads.
    pub load_responses: Vec<String>,
    /// Response URLs emitted after the play control is clicked.
    pub play_responses: Vec<String>,
    /// Markup returned after interaction.
    pub markup: String,
    /// Selectors considered present on the page.
    pub clickable: Vec<String>,
    pub navigation: NavigationScript,
    /// Make launch fail with this message.
    pub launch_error: Option<String>,
    /// Make markup evaluation fail.
    pub markup_error: bool,
    /// Artificial navigation latency.
    pub load_delay: Duration,
}

/// Counters shared between a launcher and the test that built it.
#[derive(Debug, Default)]
pub struct ScriptedStats {
    launches: AtomicUsize,
    sessions_closed: AtomicUsize,
    pages_closed: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    user_agents: Mutex<Vec<String>>,
}

impl ScriptedStats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    /// URLs passed to `navigate`, in call order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

pub struct ScriptedLauncher {
    script: PageScript,
    stats: Arc<ScriptedStats>,
}

impl ScriptedLauncher {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            stats: Arc::new(ScriptedStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ScriptedStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        if let Some(msg) = &self.script.launch_error {
            bail!("{msg}");
        }
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script: self.script.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct ScriptedSession {
    script: PageScript,
    stats: Arc<ScriptedStats>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn new_page(&self) -> Result<Box<dyn PageContext>> {
        let (tx, rx) = mpsc::unbounded();
        Ok(Box::new(ScriptedPage {
            script: self.script.clone(),
            stats: Arc::clone(&self.stats),
            responses: tx,
            receiver: Mutex::new(Some(rx)),
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedPage {
    script: PageScript,
    stats: Arc<ScriptedStats>,
    responses: mpsc::UnboundedSender<String>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl ScriptedPage {
    fn emit(&self, urls: &[String]) {
        for url in urls {
            // Nobody listening is fine, same as a real page.
            let _ = self.responses.unbounded_send(url.clone());
        }
    }
}

#[async_trait]
impl PageContext for ScriptedPage {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.stats
            .user_agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(user_agent.to_string());
        Ok(())
    }

    async fn response_urls(&self) -> Result<BoxStream<'static, String>> {
        match self.receiver.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(rx) => Ok(rx.boxed()),
            None => bail!("response stream already taken"),
        }
    }

    async fn navigate(&mut self, url: &str, _idle_window: Duration) -> Result<NavigationResult> {
        self.stats
            .navigations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        if !self.script.load_delay.is_zero() {
            tokio::time::sleep(self.script.load_delay).await;
        }
        self.emit(&self.script.load_responses);

        match &self.script.navigation {
            NavigationScript::Load => Ok(NavigationResult {
                final_url: url.to_string(),
                load_time_ms: self.script.load_delay.as_millis() as u64,
            }),
            NavigationScript::Fail(msg) => bail!("{msg}"),
            NavigationScript::Timeout => Err(ExtractError::NavigationTimeout {
                ms: self.script.load_delay.as_millis() as u64,
            }
            .into()),
            NavigationScript::Hang => futures::future::pending().await,
        }
    }

    async fn click(&self, selector: &str, _wait: Duration) -> Result<()> {
        if !self.script.clickable.iter().any(|s| s == selector) {
            bail!("no element matching {selector}");
        }
        self.emit(&self.script.play_responses);
        Ok(())
    }

    async fn get_html(&self) -> Result<String> {
        if self.script.markup_error {
            bail!("Execution context was destroyed");
        }
        Ok(self.script.markup.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
