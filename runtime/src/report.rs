// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Structured extraction results and the standalone-mode artifacts.

use crate::manifest::ManifestSet;
use crate::proxy::ProxyRewriter;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File holding only the best proxied URL.
pub const BEST_URL_FILE: &str = "videasy_m3u8_url.txt";

/// File holding the full JSON report.
pub const RESULTS_FILE: &str = "videasy_results.json";

/// Current time as RFC 3339 UTC with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub videasy_url: String,
    pub original_m3u8_urls: Vec<String>,
    pub proxied_m3u8_urls: Vec<String>,
    pub best_proxied_url: String,
    pub timestamp: String,
}

impl ExtractionReport {
    /// Build a report, or `None` when nothing was found.
    pub fn build(target: &str, urls: &ManifestSet, proxy: &ProxyRewriter) -> Option<Self> {
        let proxied = proxy.rewrite_all(urls.iter());
        let best = proxied.first()?.clone();
        Some(Self {
            videasy_url: target.to_string(),
            original_m3u8_urls: urls.as_slice().to_vec(),
            proxied_m3u8_urls: proxied,
            best_proxied_url: best,
            timestamp: timestamp_now(),
        })
    }

    /// Write [`BEST_URL_FILE`] and [`RESULTS_FILE`] into `dir`.
    pub fn write_artifacts(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let best_path = dir.join(BEST_URL_FILE);
        std::fs::write(&best_path, &self.best_proxied_url)
            .with_context(|| format!("failed to write {}", best_path.display()))?;

        let results_path = dir.join(RESULTS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&results_path, json)
            .with_context(|| format!("failed to write {}", results_path.display()))?;

        Ok((best_path, results_path))
    }
}

/// Body of a successful `POST /api/extract-m3u8`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess {
    pub success: bool,
    #[serde(flatten)]
    pub report: ExtractionReport,
}

impl From<ExtractionReport> for ApiSuccess {
    fn from(report: ExtractionReport) -> Self {
        Self {
            success: true,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractionReport {
        let urls: ManifestSet = ["https://cdn.test/a.m3u8", "https://cdn.test/b.m3u8"]
            .into_iter()
            .collect();
        ExtractionReport::build(
            "https://player.videasy.net/movie/299534",
            &urls,
            &ProxyRewriter::new("https://proxy.test/p?url="),
        )
        .expect("non-empty report")
    }

    #[test]
    fn test_build_uses_first_url_as_best() {
        let report = sample();
        assert_eq!(report.original_m3u8_urls.len(), 2);
        assert_eq!(report.proxied_m3u8_urls.len(), 2);
        assert_eq!(
            report.best_proxied_url,
            "https://proxy.test/p?url=https%3A%2F%2Fcdn.test%2Fa.m3u8"
        );
        assert!(report.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_build_empty_is_none() {
        let report = ExtractionReport::build("x", &ManifestSet::new(), &ProxyRewriter::default());
        assert!(report.is_none());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp_now();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        // 2026-10-19T12:00:00.000Z
        assert_eq!(ts.len(), 24);
    }

    #[test]
    fn test_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample();
        let (best, results) = report.write_artifacts(dir.path()).unwrap();

        assert_eq!(std::fs::read_to_string(best).unwrap(), report.best_proxied_url);
        let parsed: ExtractionReport =
            serde_json::from_str(&std::fs::read_to_string(results).unwrap()).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_api_success_is_flat() {
        let body = serde_json::to_value(ApiSuccess::from(sample())).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["videasy_url"], "https://player.videasy.net/movie/299534");
        assert!(body["best_proxied_url"].is_string());
    }
}
