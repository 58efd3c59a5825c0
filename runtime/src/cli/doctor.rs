//! Environment readiness check.

use crate::cli::output::{self, Styled};
use crate::config::{self, Config};
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Minimum free memory for one browser session.
const MIN_MEMORY_MB: u64 = 256;

/// What the doctor found.
#[derive(Debug, Serialize)]
struct Report {
    os: &'static str,
    arch: &'static str,
    chromium: Option<PathBuf>,
    available_memory_mb: Option<u64>,
    config_file: Option<PathBuf>,
    proxy_prefix: String,
    max_concurrent: usize,
    ready: bool,
}

impl Report {
    fn collect(config: &Config, config_path: Option<&Path>) -> Self {
        let chromium = find_chromium(config.browser.chromium_path.as_deref());
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            ready: chromium.is_some(),
            chromium,
            available_memory_mb: get_available_memory_mb(),
            config_file: config::resolve_config_path(config_path),
            proxy_prefix: config.proxy_prefix().to_string(),
            max_concurrent: config.browser.max_concurrent,
        }
    }
}

/// Check Chromium availability, proxy settings, and available memory.
///
/// `config_path` is the `--config` value, if one was given.
pub async fn run(config: &Config, config_path: Option<&Path>) -> Result<()> {
    let report = Report::collect(config, config_path);

    if output::is_json() {
        output::print_json(&report);
        return Ok(());
    }

    let s = Styled::new();
    println!("vidgrab doctor");
    println!("==============");
    println!();
    println!("OS:   {}", report.os);
    println!("Arch: {}", report.arch);
    println!();

    match &report.chromium {
        Some(path) => println!("{} Chromium found: {}", s.ok_sym(), path.display()),
        None => println!(
            "{} Chromium NOT found. Install Chrome or set VIDGRAB_CHROMIUM_PATH.",
            s.err_sym()
        ),
    }

    match report.available_memory_mb {
        Some(mb) if mb >= MIN_MEMORY_MB => {
            println!("{} Available memory: {mb}MB", s.ok_sym())
        }
        Some(mb) => println!(
            "{} Available memory: {mb}MB (< {MIN_MEMORY_MB}MB, may be insufficient)",
            s.warn_sym()
        ),
        None => println!("{} Could not determine available memory", s.warn_sym()),
    }

    match &report.config_file {
        Some(path) => println!("{} Config file: {}", s.ok_sym(), path.display()),
        None => println!("{} No config file {}", s.ok_sym(), s.dim("(using defaults)")),
    }
    println!("    Proxy prefix:   {}", report.proxy_prefix);
    println!("    Max concurrent: {}", report.max_concurrent);

    println!();
    if report.ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}

/// Get available memory in MB (platform-specific).
fn get_available_memory_mb() -> Option<u64> {
    #[cfg(target_os = "macos")]
    {
        let output = Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()?;
        let bytes: u64 = String::from_utf8_lossy(&output.stdout).trim().parse().ok()?;
        Some(bytes / 1_048_576)
    }
    #[cfg(target_os = "linux")]
    {
        let output = Command::new("free").arg("-m").output().ok()?;
        parse_free_output(&String::from_utf8_lossy(&output.stdout))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// The "available" column of the `Mem:` row of `free -m`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_free_output(out: &str) -> Option<u64> {
    out.lines()
        .find(|line| line.starts_with("Mem:"))
        .and_then(|line| line.split_whitespace().nth(6))
        .and_then(|v| v.parse().ok())
}
