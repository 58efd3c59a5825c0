// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Manifest URL detection and the ordered, deduplicated result set.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Literal substring that marks a URL as an HLS manifest reference.
pub const MANIFEST_MARKER: &str = ".m3u8";

/// Where a manifest URL was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Network,
    Markup,
}

/// Whether `url` is an absolute http(s) URL carrying the manifest marker.
pub fn is_manifest_url(url: &str) -> bool {
    if !url.contains(MANIFEST_MARKER) {
        return false;
    }
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"https?://[^\s"']*\.m3u8[^\s"']*"#).expect("manifest regex is valid")
    })
}

/// Find manifest URLs embedded in page markup, in document order.
///
/// A match runs from the scheme to the first whitespace or quote character.
/// Duplicates are kept here; [`ManifestSet`] handles dedup.
pub fn scan_markup(html: &str) -> Vec<String> {
    markup_regex()
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .filter(|u| is_manifest_url(u))
        .collect()
}

/// Ordered set of manifest URLs. Insertion order is discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ManifestSet {
    urls: Vec<String>,
}

impl ManifestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `url` unless it is already present or not a manifest URL.
    /// Returns true when the set grew.
    pub fn insert(&mut self, url: &str) -> bool {
        if !is_manifest_url(url) || self.contains(url) {
            return false;
        }
        self.urls.push(url.to_string());
        true
    }

    /// Insert every URL from `urls` in order; returns how many were new.
    pub fn extend<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter(|u| self.insert(u.as_ref()))
            .count()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    /// The first-discovered URL, which callers treat as the best candidate.
    pub fn best(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

impl<S: AsRef<str>> FromIterator<S> for ManifestSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ManifestSet::new();
        set.extend(iter);
        set
    }
}
