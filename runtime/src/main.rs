// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vidgrab_runtime::cli;
use vidgrab_runtime::config::Config;

#[derive(Parser)]
#[command(
    name = "vidgrab",
    about = "vidgrab: m3u8 manifest extractor for embedded video players",
    version,
    after_help = "Run 'vidgrab <command> --help' for details on each command.\nRun 'vidgrab' with no command to start the HTTP server."
)]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Maximum simultaneous browser sessions
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Extract manifests from one player page and write result files
    Extract {
        /// Player URL (defaults to the configured target)
        url: Option<String>,
        /// Directory for the result files
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Print the effective configuration
    Config,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "vidgrab=debug,vidgrab_runtime=debug,tower_http=debug"
    } else {
        "vidgrab=info,vidgrab_runtime=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn dispatch(command: Option<Commands>, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = Config::load(config_path.as_deref())?;

    match command {
        // No subcommand → serve with defaults
        None => cli::serve::run(&config).await,

        Some(Commands::Serve {
            host,
            port,
            max_concurrent,
        }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(n) = max_concurrent {
                config.browser.max_concurrent = n;
            }
            cli::serve::run(&config).await
        }
        Some(Commands::Extract { url, out_dir }) => {
            cli::extract_cmd::run(&config, url.as_deref(), &out_dir).await
        }
        Some(Commands::Doctor) => cli::doctor::run(&config, config_path.as_deref()).await,
        Some(Commands::Config) => {
            cli::output::print_json(&config);
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "vidgrab", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("VIDGRAB_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("VIDGRAB_QUIET", "1");
    }
    if cli.no_color {
        std::env::set_var("VIDGRAB_NO_COLOR", "1");
    }
    init_tracing(cli.verbose, cli.log_json);

    let result = dispatch(cli.command, cli.config).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !cli::output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
