//! JobBook CLI - command-line front end for the JobBook contacts manager.
//!
//! Every invocation starts the persistence coordinator over the configured
//! stores, runs one command through it, and exits. Prompts and notices go
//! through the terminal; command output goes to stdout.

mod commands;
mod terminal;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use jb_core::config::AppConfig;
use jb_core::error::JbResult;
use jb_core::logging;

/// JobBook - local contacts, job tickets and attachments for small trades businesses.
#[derive(Parser)]
#[command(
    name = "jobbook",
    version,
    about = "JobBook contacts manager CLI",
    long_about = "A command-line interface for JobBook.\n\
                  Manage contacts, job tickets, attachments and backups stored on this machine."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Answer yes to every confirmation prompt.
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Use in-memory stores that are discarded on exit.
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Also show warnings and errors as desktop notifications.
    #[arg(long, global = true)]
    notify: bool,

    /// Store data in this directory instead of the configured one.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List, view and edit contacts.
    Contacts {
        #[command(subcommand)]
        action: commands::contacts::ContactsAction,
    },
    /// Manage contact attachments.
    Files {
        #[command(subcommand)]
        action: commands::files::FilesAction,
    },
    /// Manage job tickets and invoices.
    Tickets {
        #[command(subcommand)]
        action: commands::tickets::TicketsAction,
    },
    /// Manage the default custom fields offered on new contacts.
    Fields {
        #[command(subcommand)]
        action: commands::fields::FieldsAction,
    },
    /// View and edit business details shown on invoices.
    Business {
        #[command(subcommand)]
        action: commands::business::BusinessAction,
    },
    /// Export and import full backups.
    Backup {
        #[command(subcommand)]
        action: commands::backup::BackupAction,
    },
    /// Inspect or resolve a pending crash-recovery snapshot.
    Recovery {
        #[command(subcommand)]
        action: commands::recovery::RecoveryAction,
    },
    /// Storage usage and file locations.
    Storage {
        #[command(subcommand)]
        action: commands::storage::StorageAction,
    },
}

/// Settings shared by every command.
pub struct Context {
    pub config: AppConfig,
    pub format: OutputFormat,
    pub assume_yes: bool,
    pub ephemeral: bool,
    pub desktop_notify: bool,
}

fn load_config(path: Option<&Path>) -> JbResult<AppConfig> {
    match path {
        Some(path) => AppConfig::load_named(path),
        None => AppConfig::load_default(),
    }
}

#[tokio::main]
async fn main() -> JbResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = load_config(cli.config.as_deref().map(Path::new))?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }

    // Initialize logging
    let level_override = cli.verbose.then_some("debug");
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| PathBuf::from("logs"));
    let _guard = logging::init_from_config(&config.logging, &log_dir, level_override)?;

    info!("JobBook CLI v{}", jb_core::constants::APP_VERSION);
    debug!("ephemeral={}, assume_yes={}", cli.ephemeral, cli.yes);

    let ctx = Context {
        config,
        format: cli.format,
        assume_yes: cli.yes,
        ephemeral: cli.ephemeral,
        desktop_notify: cli.notify,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Contacts { action } => commands::contacts::run(&ctx, action).await,
        Commands::Files { action } => commands::files::run(&ctx, action).await,
        Commands::Tickets { action } => commands::tickets::run(&ctx, action).await,
        Commands::Fields { action } => commands::fields::run(&ctx, action).await,
        Commands::Business { action } => commands::business::run(&ctx, action).await,
        Commands::Backup { action } => commands::backup::run(&ctx, action).await,
        Commands::Recovery { action } => commands::recovery::run(&ctx, action).await,
        Commands::Storage { action } => commands::storage::run(&ctx, action).await,
    }
}
