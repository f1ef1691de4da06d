//! CLI commands and output formatting for the catalog.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use super::app_id::ApplicationId;
use super::error::Result;
use super::manager::{ActionReport, AppManager, AppStatus};
use super::reconcile::{Action, ReconciliationState};
use super::remote::{CatalogSource, RemoteCatalog};
use super::store::InstallStore;
use crate::config::{InstallStrategy, ManagerConfig};

/// Catalog subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum CatalogCommand {
    /// List every catalog application with its state
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the state of one application
    Status {
        /// Application id
        id: ApplicationId,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download or update an application
    Install {
        /// Application id
        id: ApplicationId,

        /// Skip confirmation prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Start an installed application
    Launch {
        /// Application id
        id: ApplicationId,
    },

    /// Remove an installed application
    Remove {
        /// Application id
        id: ApplicationId,

        /// Skip confirmation prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Execute a catalog command against the configured remote catalog.
pub async fn execute(command: CatalogCommand, config: &ManagerConfig) -> Result<ExitCode> {
    let store = InstallStore::from_config(&config.install)?;
    let catalog = Arc::new(RemoteCatalog::new(config.catalog.clone())?);
    let manager = AppManager::new(catalog, store, &config.install);

    match command {
        CatalogCommand::List { json } => handle_list(&manager, json).await,
        CatalogCommand::Status { id, json } => handle_status(&manager, &id, json).await,
        CatalogCommand::Install { id, yes } => {
            handle_install(&manager, &id, yes, config.install.strategy).await
        }
        CatalogCommand::Launch { id } => {
            let report = manager.perform(&id, Action::Launch).await;
            Ok(print_report(&report))
        }
        CatalogCommand::Remove { id, yes } => handle_remove(&manager, &id, yes),
    }
}

async fn handle_list<C: CatalogSource>(manager: &AppManager<C>, json: bool) -> Result<ExitCode> {
    let statuses = manager.statuses().await?;

    if json {
        println!("{}", format_json(&statuses)?);
    } else {
        let headers = &["NAME", "STATE", "ACTION"];
        let rows: Vec<Vec<String>> = statuses.iter().map(status_row).collect();
        format_table(headers, rows);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_status<C: CatalogSource>(
    manager: &AppManager<C>,
    id: &ApplicationId,
    json: bool,
) -> Result<ExitCode> {
    let state = manager.status(id).await?;

    if json {
        println!("{}", format_json(&state)?);
    } else {
        println!("{id}: {state}");
        println!("Action: {}", state.action());
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_install<C: CatalogSource>(
    manager: &AppManager<C>,
    id: &ApplicationId,
    yes: bool,
    strategy: InstallStrategy,
) -> Result<ExitCode> {
    let installed = manager.store().read_install_record(id)?;

    if let Some(record) = &installed
        && strategy == InstallStrategy::Replace
        && !yes
        && is_tty()
    {
        let prompt = format!(
            "The installed {id} ({}) is removed before the new version is downloaded. Continue?",
            record.installed_version
        );
        if !confirm(&prompt) {
            eprintln!("Installation cancelled");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let action = if installed.is_some() {
        Action::Update
    } else {
        Action::Download
    };

    let spinner = spinner(&format!("{action} {id}..."));
    let report = manager.perform(id, action).await;
    spinner.finish_and_clear();

    Ok(print_report(&report))
}

fn handle_remove<C: CatalogSource>(
    manager: &AppManager<C>,
    id: &ApplicationId,
    yes: bool,
) -> Result<ExitCode> {
    if !yes && is_tty() && !confirm(&format!("Remove {id}?")) {
        eprintln!("Removal cancelled");
        return Ok(ExitCode::SUCCESS);
    }

    if manager.remove(id)? {
        eprintln!("Removed {id}");
    } else {
        eprintln!("{id} is not installed");
    }
    Ok(ExitCode::SUCCESS)
}

fn status_row(status: &AppStatus) -> Vec<String> {
    let state = match (&status.state, &status.error) {
        (Some(state), _) => state.to_string(),
        (None, Some(error)) => format!("error: {error}"),
        (None, None) => "unknown".to_string(),
    };
    let action = status
        .action()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    vec![status.id.to_string(), state, action]
}

/// Print an action report and map it to an exit code.
fn print_report(report: &ActionReport) -> ExitCode {
    eprintln!("{}", report.message);
    if let Some(state) = &report.state
        && *state != ReconciliationState::NotInstalled
    {
        eprintln!("{}: {state}", report.id);
    }
    if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Check if stdout is a TTY.
fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Prompt user for confirmation. A failed prompt counts as "no".
fn confirm(prompt: &str) -> bool {
    match Confirm::new().with_prompt(prompt).default(false).interact() {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Confirmation prompt failed: {e}");
            false
        }
    }
}

/// Format and print a table to stdout.
fn format_table(headers: &[&str], rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        eprintln!("No applications found");
        return;
    }
    for line in table_lines(headers, &rows) {
        println!("{line}");
    }
}

/// Lay out a header, a separator and the padded rows, one string per line.
fn table_lines(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let pad = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = width)
            })
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(pad(headers.iter().map(|h| h.to_string()).collect()));
    lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    for row in rows {
        lines.push(pad(row.clone()));
    }
    lines
}

/// Format data as JSON.
fn format_json<T: serde::Serialize>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}
