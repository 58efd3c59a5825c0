// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Target locators: the player-page URLs extraction starts from.

use url::Url;

/// Query parameter appended to every locator so the player starts on load.
pub const AUTOPLAY_PARAM: &str = "autoplay=1";

/// Player URL for a movie identifier.
pub fn movie(base_url: &str, id: &str) -> String {
    format!("{}/movie/{}", base_url.trim_end_matches('/'), id)
}

/// Player URL for a single TV episode.
pub fn tv(base_url: &str, show: &str, season: &str, episode: &str) -> String {
    format!(
        "{}/tv/{}/{}/{}",
        base_url.trim_end_matches('/'),
        show,
        season,
        episode
    )
}

/// Append the autoplay parameter, joining with `&` when a query already exists.
pub fn with_autoplay(locator: &str) -> String {
    let sep = if locator.contains('?') { '&' } else { '?' };
    format!("{locator}{sep}{AUTOPLAY_PARAM}")
}

/// Whether a caller-supplied URL points at the source site.
///
/// Matching is a plain substring test on `host_marker`, as the player site
/// serves from a single host. The URL must also parse as absolute http(s).
pub fn is_source_url(url: &str, host_marker: &str) -> bool {
    if !url.contains(host_marker) {
        return false;
    }
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
