// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! The extraction procedure.
//!
//! One call launches one browser, loads the player page with autoplay,
//! pokes the play control, and collects manifest URLs from network
//! responses and from the rendered markup. Browser-level failures never
//! escape: they are recorded on the returned [`Extraction`] next to
//! whatever was collected before the failure.

use crate::config::ExtractSettings;
use crate::error::ExtractError;
use crate::manifest::{scan_markup, ManifestSet, Origin, MANIFEST_MARKER};
use crate::renderer::{BrowserLauncher, BrowserSession, PageContext};
use crate::target::with_autoplay;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Outcome of one extraction call.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The locator that was requested (without the autoplay parameter).
    pub target: String,
    /// Manifest URLs, network-observed first, then markup-scraped.
    pub urls: ManifestSet,
    /// Set when the session stopped early. `urls` may still be non-empty.
    pub failure: Option<ExtractError>,
    pub elapsed_ms: u64,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls.into_vec()
    }

    /// Short label for logs: `found`, `empty`, or the failure kind.
    pub fn status(&self) -> &'static str {
        match (&self.failure, self.urls.is_empty()) {
            (Some(e), _) => e.kind(),
            (None, true) => "empty",
            (None, false) => "found",
        }
    }
}

type Accumulator = Arc<Mutex<ManifestSet>>;

fn record(acc: &Accumulator, url: &str, origin: Origin) -> bool {
    let added = acc.lock().unwrap_or_else(|e| e.into_inner()).insert(url);
    if added {
        info!(?origin, url, "found m3u8");
    }
    added
}

pub struct Extractor {
    launcher: Arc<dyn BrowserLauncher>,
    settings: ExtractSettings,
}

impl Extractor {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: ExtractSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn settings(&self) -> &ExtractSettings {
        &self.settings
    }

    /// Run the full procedure against `target`.
    ///
    /// Always returns; the browser process is closed on every path.
    pub async fn extract(&self, target: &str) -> Extraction {
        let request_id = Uuid::new_v4();
        let span = info_span!("extract", %request_id, locator = target);
        self.extract_inner(target).instrument(span).await
    }

    async fn extract_inner(&self, target: &str) -> Extraction {
        let start = Instant::now();
        let acc: Accumulator = Arc::new(Mutex::new(ManifestSet::new()));

        info!("launching browser");
        let failure = match self.launcher.launch().await {
            Ok(session) => {
                let result = self.run_session(session.as_ref(), target, &acc).await;
                if let Err(e) = session.close().await {
                    debug!("ignoring browser close error: {e:#}");
                }
                result.err()
            }
            Err(e) => Some(ExtractError::Launch(format!("{e:#}"))),
        };

        let urls = std::mem::take(&mut *acc.lock().unwrap_or_else(|e| e.into_inner()));
        let extraction = Extraction {
            target: target.to_string(),
            urls,
            failure,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        match &extraction.failure {
            Some(e) => warn!(
                kind = e.kind(),
                found = extraction.urls.len(),
                elapsed_ms = extraction.elapsed_ms,
                "extraction stopped early: {e}"
            ),
            None => info!(
                found = extraction.urls.len(),
                elapsed_ms = extraction.elapsed_ms,
                "extraction finished"
            ),
        }
        extraction
    }

    async fn run_session(
        &self,
        session: &dyn BrowserSession,
        target: &str,
        acc: &Accumulator,
    ) -> Result<(), ExtractError> {
        let mut page = session
            .new_page()
            .await
            .map_err(|e| ExtractError::Page(format!("{e:#}")))?;
        let result = self.run_page(page.as_mut(), target, acc).await;
        if let Err(e) = page.close().await {
            debug!("ignoring page close error: {e:#}");
        }
        result
    }

    async fn run_page(
        &self,
        page: &mut dyn PageContext,
        target: &str,
        acc: &Accumulator,
    ) -> Result<(), ExtractError> {
        if let Err(e) = page.set_user_agent(&self.settings.user_agent).await {
            warn!("could not set user agent: {e:#}");
        }

        let responses = page
            .response_urls()
            .await
            .map_err(|e| ExtractError::Page(format!("{e:#}")))?;
        let observer = ResponseObserver::spawn(responses, Arc::clone(acc));

        let loaded = self.load_and_play(page, target).await;
        // Network entries must land before any markup entry.
        observer.finish().await;
        loaded?;

        let html = page
            .get_html()
            .await
            .map_err(|e| ExtractError::Evaluation(format!("{e:#}")))?;
        let scraped = scan_markup(&html)
            .iter()
            .filter(|url| record(acc, url, Origin::Markup))
            .count();
        debug!(scraped, "markup scan done");
        Ok(())
    }

    async fn load_and_play(
        &self,
        page: &mut dyn PageContext,
        target: &str,
    ) -> Result<(), ExtractError> {
        let url = with_autoplay(target);
        let timeout = self.settings.navigation_timeout();
        info!(%url, "loading page with autoplay");

        let navigation = page.navigate(&url, self.settings.idle_window());
        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(nav)) => debug!(
                final_url = %nav.final_url,
                load_time_ms = nav.load_time_ms,
                "page loaded"
            ),
            Ok(Err(e)) => {
                return Err(e
                    .downcast_ref::<ExtractError>()
                    .cloned()
                    .unwrap_or_else(|| ExtractError::Navigation(format!("{e:#}"))));
            }
            Err(_) => {
                return Err(ExtractError::NavigationTimeout {
                    ms: self.settings.navigation_timeout_ms,
                })
            }
        }

        tokio::time::sleep(self.settings.settle_delay()).await;

        match page
            .click(&self.settings.play_selector, self.settings.play_wait())
            .await
        {
            Ok(()) => {
                info!("clicked play control");
                tokio::time::sleep(self.settings.play_delay()).await;
            }
            Err(e) => info!("no play control found, continuing: {e:#}"),
        }
        Ok(())
    }
}

/// Background task appending manifest responses to the accumulator.
struct ResponseObserver {
    stop: oneshot::Sender<()>,
    task: JoinHandle<usize>,
}

impl ResponseObserver {
    fn spawn(mut responses: BoxStream<'static, String>, acc: Accumulator) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut seen = 0usize;
            let mut observe = |url: String| {
                if url.contains(MANIFEST_MARKER) && record(&acc, &url, Origin::Network) {
                    seen += 1;
                }
            };
            loop {
                tokio::select! {
                    biased;
                    next = responses.next() => match next {
                        Some(url) => observe(url),
                        None => break,
                    },
                    _ = &mut stopped => {
                        // Take whatever is already buffered, then quit.
                        while let Some(Some(url)) = responses.next().now_or_never() {
                            observe(url);
                        }
                        break;
                    }
                }
            }
            seen
        });
        Self { stop, task }
    }

    async fn finish(self) {
        let _ = self.stop.send(());
        match self.task.await {
            Ok(seen) => debug!(seen, "response observer stopped"),
            Err(e) => warn!("response observer failed: {e}"),
        }
    }
}
