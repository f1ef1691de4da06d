//! Download Manager - local application installer and launcher.
//!
//! This is the main entry point, which:
//! - Loads configuration from TOML
//! - Resolves the per-user install root
//! - Runs one catalog command (list, status, install, launch, remove)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use download_manager::catalog::{CatalogCommand, execute};
use download_manager::config::{CONFIG_FILE_NAME, ManagerConfig};

/// Download Manager - install, update and launch catalog applications
#[derive(Parser, Debug)]
#[command(name = "download-manager")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the per-user data directory
    #[arg(long, value_name = "DIR", global = true)]
    data_root: Option<PathBuf>,

    /// Run in verbose mode (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CatalogCommand,
}

/// Log filter used when `RUST_LOG` is unset.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "download_manager=debug"
    } else {
        "download_manager=info"
    }
}

/// Load configuration from file, falling back to defaults.
fn load_config(path: Option<PathBuf>) -> Result<ManagerConfig> {
    if let Some(path) = path {
        debug!("Loading configuration from {}", path.display());
        return ManagerConfig::load(&path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        debug!("Loading configuration from {}", local.display());
        return Ok(ManagerConfig::load(&local)?);
    }

    if let Some(dirs) = directories::ProjectDirs::from("com", "trueoffice", "download-manager") {
        let user_config = dirs.config_dir().join(CONFIG_FILE_NAME);
        if user_config.exists() {
            debug!("Loading configuration from {}", user_config.display());
            return Ok(ManagerConfig::load(&user_config)?);
        }
    }

    debug!("No configuration file found, using defaults");
    Ok(ManagerConfig::default())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let log_level = default_log_filter(args.verbose);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    let mut config = load_config(args.config).context("Failed to load configuration")?;

    if let Some(data_root) = args.data_root {
        config.install.data_root = Some(data_root);
    }

    match execute(args.command, &config).await {
        Ok(code) => Ok(code),
        Err(e) => {
            debug!("Command failed: {e:?}");
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
