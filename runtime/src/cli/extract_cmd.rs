// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! `vidgrab extract [URL]`: one-shot extraction that writes result files.

use crate::cli::output::{self, Styled};
use crate::config::Config;
use crate::extractor::Extractor;
use crate::proxy::ProxyRewriter;
use crate::report::{ExtractionReport, BEST_URL_FILE, RESULTS_FILE};
use anyhow::{bail, Result};
use std::path::Path;

/// Run the extract command.
pub async fn run(config: &Config, url: Option<&str>, out_dir: &Path) -> Result<()> {
    let target = url.unwrap_or(&config.source.default_target);
    let proxy = ProxyRewriter::new(config.proxy_prefix());
    let s = Styled::new();

    if !output::is_quiet() && !output::is_json() {
        eprintln!("  vidgrab m3u8 extractor");
        eprintln!("  {}", "=".repeat(50));
        eprintln!("  Target: {target}");
    }

    let extractor = super::extractor(config);
    let Some(report) = extract_to(&extractor, &proxy, target, out_dir).await? else {
        if !output::is_json() {
            eprintln!("  {} No m3u8 URLs found", s.err_sym());
        }
        bail!("no m3u8 URLs found for {target}");
    };

    if output::is_json() {
        output::print_json(&report);
        return Ok(());
    }

    if !output::is_quiet() {
        eprintln!();
        eprintln!("  {} Found {} m3u8 URL(s):", s.ok_sym(), report.original_m3u8_urls.len());
        for (i, (original, proxied)) in report
            .original_m3u8_urls
            .iter()
            .zip(&report.proxied_m3u8_urls)
            .enumerate()
        {
            eprintln!();
            eprintln!("  {}. Original:", i + 1);
            eprintln!("     {original}");
            eprintln!("     Proxied:");
            eprintln!("     {proxied}");
        }
        eprintln!();
        eprintln!("  Saved to:");
        eprintln!("    - {} {}", BEST_URL_FILE, s.dim("(ready-to-use proxied URL)"));
        eprintln!("    - {} {}", RESULTS_FILE, s.dim("(full results)"));
        eprintln!();
    }
    println!("{}", report.best_proxied_url);
    Ok(())
}

/// Extract `target` and, when anything was found, write both artifacts to
/// `out_dir`.
pub async fn extract_to(
    extractor: &Extractor,
    proxy: &ProxyRewriter,
    target: &str,
    out_dir: &Path,
) -> Result<Option<ExtractionReport>> {
    let extraction = extractor.extract(target).await;
    let Some(report) = ExtractionReport::build(target, &extraction.urls, proxy) else {
        return Ok(None);
    };
    report.write_artifacts(out_dir)?;
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractSettings;
    use crate::renderer::scripted::{PageScript, ScriptedLauncher};
    use std::sync::Arc;

    fn extractor(script: PageScript) -> Extractor {
        Extractor::new(
            Arc::new(ScriptedLauncher::new(script)),
            ExtractSettings::immediate(),
        )
    }

    #[tokio::test]
    async fn test_extract_to_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(PageScript {
            load_responses: vec!["https://cdn.test/master.m3u8".into()],
            ..Default::default()
        });
        let proxy = ProxyRewriter::new("https://proxy.test/?url=");

        let report = extract_to(&ex, &proxy, "https://player.videasy.net/movie/1", dir.path())
            .await
            .unwrap()
            .expect("report");

        let best = std::fs::read_to_string(dir.path().join(BEST_URL_FILE)).unwrap();
        assert_eq!(best, "https://proxy.test/?url=https%3A%2F%2Fcdn.test%2Fmaster.m3u8");
        assert_eq!(best, report.best_proxied_url);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(RESULTS_FILE)).unwrap())
                .unwrap();
        assert_eq!(json["videasy_url"], "https://player.videasy.net/movie/1");
        assert_eq!(json["original_m3u8_urls"][0], "https://cdn.test/master.m3u8");
    }

    #[tokio::test]
    async fn test_extract_to_writes_nothing_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(PageScript::default());
        let report = extract_to(
            &ex,
            &ProxyRewriter::default(),
            "https://player.videasy.net/movie/1",
            dir.path(),
        )
        .await
        .unwrap();

        assert!(report.is_none());
        assert!(!dir.path().join(BEST_URL_FILE).exists());
        assert!(!dir.path().join(RESULTS_FILE).exists());
    }
}
