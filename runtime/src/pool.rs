// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded extraction executor with in-flight request coalescing.
//!
//! At most `max_concurrent` browser processes run at once. Requests for a
//! target that is already being extracted join the running extraction
//! instead of starting another browser.

use crate::error::ExtractError;
use crate::extractor::{Extraction, Extractor};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

type SharedExtraction = Shared<BoxFuture<'static, Result<Extraction, ExtractError>>>;

pub struct ExtractionPool {
    extractor: Arc<Extractor>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    inflight: Arc<DashMap<String, SharedExtraction>>,
}

/// Removes the in-flight entry when the worker finishes, including by panic.
struct InflightGuard {
    map: Arc<DashMap<String, SharedExtraction>>,
    key: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

impl ExtractionPool {
    pub fn new(extractor: Arc<Extractor>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            extractor,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Extract `target`, sharing the result with concurrent callers.
    ///
    /// `Err` only when the worker task itself died; browser failures are
    /// reported inside the [`Extraction`].
    pub async fn extract(&self, target: &str) -> Result<Extraction, ExtractError> {
        let shared = match self.inflight.entry(target.to_string()) {
            Entry::Occupied(entry) => {
                debug!(locator = target, "joining in-flight extraction");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let shared = self.spawn_worker(target.to_string());
                entry.insert(shared.clone());
                shared
            }
        };
        shared.await
    }

    /// Number of distinct targets currently being extracted.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// Browser slots not currently in use.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    // The worker is a spawned task so a caller going away never cancels a
    // browser session mid-procedure.
    fn spawn_worker(&self, target: String) -> SharedExtraction {
        let extractor = Arc::clone(&self.extractor);
        let permits = Arc::clone(&self.permits);
        let inflight = Arc::clone(&self.inflight);

        let handle = tokio::spawn(async move {
            // Built inside the task: dropping it while the caller still
            // holds the map entry would deadlock the shard.
            let _guard = InflightGuard {
                map: inflight,
                key: target.clone(),
            };
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ExtractError::Worker(e.to_string()))?;
            Ok::<_, ExtractError>(extractor.extract(&target).await)
        });

        async move {
            handle
                .await
                .map_err(|e| ExtractError::Worker(e.to_string()))?
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractSettings;
    use crate::renderer::scripted::{PageScript, ScriptedLauncher, ScriptedStats};
    use std::time::Duration;

    fn pool(script: PageScript, max: usize) -> (ExtractionPool, Arc<ScriptedStats>) {
        let launcher = ScriptedLauncher::new(script);
        let stats = launcher.stats();
        let extractor = Arc::new(Extractor::new(
            Arc::new(launcher),
            ExtractSettings::immediate(),
        ));
        (ExtractionPool::new(extractor, max), stats)
    }

    fn slow_script() -> PageScript {
        PageScript {
            load_responses: vec!["https://cdn.test/m.m3u8".into()],
            load_delay: Duration::from_millis(100),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_same_target_is_coalesced() {
        let (pool, stats) = pool(slow_script(), 4);
        let target = "https://player.videasy.net/movie/1";

        let (a, b, c) = tokio::join!(
            pool.extract(target),
            pool.extract(target),
            pool.extract(target)
        );

        assert_eq!(stats.launches(), 1);
        for r in [a, b, c] {
            assert_eq!(r.unwrap().urls.as_slice(), &["https://cdn.test/m.m3u8"]);
        }
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_targets_run_separately() {
        let (pool, stats) = pool(slow_script(), 4);
        let (a, b) = tokio::join!(
            pool.extract("https://player.videasy.net/movie/1"),
            pool.extract("https://player.videasy.net/movie/2")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(stats.launches(), 2);
        assert_eq!(stats.sessions_closed(), 2);
    }

    #[tokio::test]
    async fn test_sequential_requests_extract_again() {
        let (pool, stats) = pool(PageScript::default(), 1);
        let target = "https://player.videasy.net/movie/9";
        pool.extract(target).await.unwrap();
        pool.extract(target).await.unwrap();
        assert_eq!(stats.launches(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let (pool, _) = pool(slow_script(), 1);
        let pool = Arc::new(pool);

        let started = std::time::Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    pool.extract(&format!("https://player.videasy.net/movie/{i}"))
                        .await
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        // One slot: three 100ms loads cannot overlap.
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        let (pool, _) = pool(PageScript::default(), 0);
        assert_eq!(pool.max_concurrent(), 1);
    }
}
