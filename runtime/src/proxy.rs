// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rewrites manifest URLs through the configured proxy endpoint.

use std::borrow::Cow;

/// Default proxy endpoint; the manifest URL is appended percent-encoded.
pub const DEFAULT_PROXY_PREFIX: &str = "https://proxystreamora9.nium0l8grm.workers.dev/proxy?url=";

/// Characters `encodeURIComponent` leaves alone but `urlencoding` escapes.
const UNRESERVED_MARKS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encode like `encodeURIComponent`.
fn encode_component(raw: &str) -> String {
    let mut encoded = urlencoding::encode(raw).into_owned();
    for (escaped, mark) in UNRESERVED_MARKS {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, mark);
        }
    }
    encoded
}

#[derive(Debug, Clone)]
pub struct ProxyRewriter {
    prefix: String,
}

impl ProxyRewriter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `prefix + percent_encode(url)`.
    pub fn rewrite(&self, url: &str) -> String {
        format!("{}{}", self.prefix, encode_component(url))
    }

    pub fn rewrite_all<'a, I>(&self, urls: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        urls.into_iter().map(|u| self.rewrite(u)).collect()
    }

    /// Recover the original URL from a proxied one.
    ///
    /// Returns `None` when `proxied` does not start with this prefix or the
    /// remainder is not valid percent-encoded UTF-8.
    pub fn original<'a>(&self, proxied: &'a str) -> Option<Cow<'a, str>> {
        let encoded = proxied.strip_prefix(self.prefix.as_str())?;
        urlencoding::decode(encoded).ok()
    }
}

impl Default for ProxyRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_encodes_reserved_characters() {
        let proxy = ProxyRewriter::new("https://proxy.test/p?url=");
        assert_eq!(
            proxy.rewrite("https://cdn.test/a b/master.m3u8?x=1&y=2"),
            "https://proxy.test/p?url=https%3A%2F%2Fcdn.test%2Fa%20b%2Fmaster.m3u8%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn test_rewrite_keeps_component_marks() {
        let proxy = ProxyRewriter::new("P:");
        let original = "https://cdn.test/(hd)/it's!*.m3u8";
        let proxied = proxy.rewrite(original);
        assert_eq!(proxied, "P:https%3A%2F%2Fcdn.test%2F(hd)%2Fit's!*.m3u8");
        assert_eq!(proxy.original(&proxied).as_deref(), Some(original));
    }

    #[test]
    fn test_rewrite_is_invertible() {
        let proxy = ProxyRewriter::default();
        for original in [
            "https://cdn.test/master.m3u8",
            "https://cdn.test/hls/index.m3u8?token=a%2Fb&exp=1700000000",
            "http://10.0.0.1:8080/live/ünïcode.m3u8#frag",
        ] {
            let proxied = proxy.rewrite(original);
            assert!(proxied.starts_with(DEFAULT_PROXY_PREFIX));
            assert_eq!(proxy.original(&proxied).as_deref(), Some(original));
        }
    }

    #[test]
    fn test_original_rejects_foreign_prefix() {
        let proxy = ProxyRewriter::new("https://proxy.test/p?url=");
        assert!(proxy.original("https://elsewhere.test/?url=abc").is_none());
    }

    #[test]
    fn test_rewrite_all_preserves_order() {
        let proxy = ProxyRewriter::new("P:");
        let out = proxy.rewrite_all(["https://a.test/1.m3u8", "https://a.test/2.m3u8"]);
        assert_eq!(
            out,
            vec!["P:https%3A%2F%2Fa.test%2F1.m3u8", "P:https%3A%2F%2Fa.test%2F2.m3u8"]
        );
    }
}
