//! Chromium-backed browser sessions using chromiumoxide.

use super::idle::IdleTracker;
use super::{BrowserLauncher, BrowserSession, NavigationResult, PageContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    SetUserAgentOverrideParams,
};
use chromiumoxide::page::Page;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Flags for running inside containers and small VMs: no OS sandbox,
/// no GPU, one process.
pub const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-web-security",
    "--disable-features=VizDisplayCompositor",
    "--disable-gpu",
    "--single-process",
    "--no-zygote",
];

/// How often the idle wait and element lookup re-check.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. Configured path or VIDGRAB_CHROMIUM_PATH
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!("configured Chromium path does not exist: {}", path.display());
    }
    if let Ok(p) = std::env::var("VIDGRAB_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.vidgrab/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".vidgrab/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".vidgrab/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".vidgrab/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".vidgrab/chromium/chrome-linux64/chrome"),
                home.join(".vidgrab/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one headless Chromium process per extraction.
pub struct ChromiumLauncher {
    executable: PathBuf,
}

impl ChromiumLauncher {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// Locate a Chromium binary, preferring `explicit`.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let executable = find_chromium(explicit)
            .context("Chromium not found. Install Chrome/Chromium or set VIDGRAB_CHROMIUM_PATH.")?;
        Ok(Self::new(executable))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        // Separate profile per process so concurrent sessions never share
        // a profile lock.
        let profile_dir =
            std::env::temp_dir().join(format!("vidgrab-profile-{}", uuid::Uuid::new_v4()));

        let builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .user_data_dir(&profile_dir);
        let config = LAUNCH_ARGS
            .iter()
            .fold(builder, |b, arg| b.arg(*arg))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("chromiumoxide handler event error: {e}");
                }
            }
        });

        debug!(profile = %profile_dir.display(), "Chromium launched");

        Ok(Box::new(ChromiumSession {
            browser,
            handler,
            profile_dir,
        }))
    }
}

/// A running Chromium process plus its CDP handler task.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn PageContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        let tracker = Arc::new(Mutex::new(IdleTracker::new(0, Instant::now())));
        let idle_task = spawn_idle_tracking(&page, Arc::clone(&tracker)).await?;

        Ok(Box::new(ChromiumPage {
            page,
            tracker,
            idle_task,
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        let closed = this
            .browser
            .close()
            .await
            .map(|_| ())
            .context("failed to close Chromium");
        if closed.is_err() {
            let _ = this.browser.kill().await;
        }
        let _ = this.browser.wait().await;
        this.handler.abort();
        let _ = std::fs::remove_dir_all(&this.profile_dir);
        closed
    }
}

/// Network-domain override, the form `Page::set_user_agent` accepts.
fn user_agent_override(user_agent: &str) -> SetUserAgentOverrideParams {
    SetUserAgentOverrideParams::new(user_agent)
}

enum NetEvent {
    Started(String),
    Done(String),
}

/// Feed request start/finish events into `tracker` for the page's lifetime.
async fn spawn_idle_tracking(
    page: &Page,
    tracker: Arc<Mutex<IdleTracker>>,
) -> Result<JoinHandle<()>> {
    let started = page
        .event_listener::<EventRequestWillBeSent>()
        .await?
        .map(|e| NetEvent::Started(e.request_id.inner().clone()));
    let finished = page
        .event_listener::<EventLoadingFinished>()
        .await?
        .map(|e| NetEvent::Done(e.request_id.inner().clone()));
    let failed = page
        .event_listener::<EventLoadingFailed>()
        .await?
        .map(|e| NetEvent::Done(e.request_id.inner().clone()));

    let mut events =
        futures::stream::select_all([started.boxed(), finished.boxed(), failed.boxed()]);

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let now = Instant::now();
            let mut t = tracker.lock().unwrap_or_else(|e| e.into_inner());
            match event {
                NetEvent::Started(id) => t.request_started(&id, now),
                NetEvent::Done(id) => t.request_finished(&id, now),
            }
        }
    }))
}

/// A single Chromium tab.
pub struct ChromiumPage {
    page: Page,
    tracker: Arc<Mutex<IdleTracker>>,
    idle_task: JoinHandle<()>,
}

impl ChromiumPage {
    fn is_idle(&self, window: Duration) -> bool {
        self.tracker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_idle(Instant::now(), window)
    }
}

#[async_trait]
impl PageContext for ChromiumPage {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.page
            .set_user_agent(user_agent_override(user_agent))
            .await
            .context("failed to set user agent")?;
        Ok(())
    }

    async fn response_urls(&self) -> Result<BoxStream<'static, String>> {
        let events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to subscribe to network responses")?;
        Ok(events.map(|e| e.response.url.clone()).boxed())
    }

    async fn navigate(&mut self, url: &str, idle_window: Duration) -> Result<NavigationResult> {
        let start = Instant::now();
        self.tracker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reset(start);

        self.page
            .goto(url)
            .await
            .with_context(|| format!("failed to load {url}"))?;

        while !self.is_idle(idle_window) {
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn click(&self, selector: &str, wait: Duration) -> Result<()> {
        let deadline = Instant::now() + wait;
        let element = loop {
            match self.page.find_element(selector).await {
                Ok(el) => break el,
                Err(e) if Instant::now() >= deadline => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("no element matching {selector} within {wait:?}")));
                }
                Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
            }
        };
        element.click().await.context("click failed")?;
        Ok(())
    }

    async fn get_html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.innerHTML")
            .await
            .context("failed to read page markup")?;

        result
            .into_value::<String>()
            .map_err(|e| anyhow::anyhow!("failed to convert markup result: {e:?}"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.idle_task.abort();
        self.page.close().await.context("failed to close page")?;
        Ok(())
    }
}
