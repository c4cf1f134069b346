use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use aika_core::{EntryController, Reconciliation, SystemClock};
use aika_db::SqliteEntryStore;
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aika_cli::commands::{delete, edit, init, list, start, status, stop, watch};
use aika_cli::{Cli, Commands, Config, identity};

/// Loads config, resolves the session and opens the entry store, ensuring
/// the database directory exists. The returned controller is reconciled.
async fn open_controller(
    config_path: Option<&Path>,
    org: Option<&str>,
) -> Result<(EntryController<SqliteEntryStore>, Reconciliation)> {
    let config = Config::load(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let identity = identity::require_identity()?;
    let session = identity.session(org.or(config.organization()))?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let store = SqliteEntryStore::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    let mut controller = EntryController::new(store, session, Arc::new(SystemClock))
        .with_tick_interval(config.tick_interval());
    let report = controller
        .reconcile()
        .await
        .context("failed to load entries")?;
    Ok((controller, report))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut stdout = std::io::stdout().lock();
    let config_path = cli.config.as_deref();
    let org = cli.org.as_deref();
    let tz = chrono::Local;

    match command {
        Commands::Init { name } => {
            init::run(&mut stdout, name.as_deref())?;
        }
        Commands::Start(args) => {
            let (mut controller, _report) = open_controller(config_path, org).await?;
            start::run(&mut stdout, &mut controller, args).await?;
        }
        Commands::Stop => {
            let (mut controller, _report) = open_controller(config_path, org).await?;
            stop::run(&mut stdout, &mut controller).await?;
        }
        Commands::Status => {
            let (controller, report) = open_controller(config_path, org).await?;
            status::run(&mut stdout, &controller, &report, &tz)?;
        }
        Commands::Watch => {
            let (controller, _report) = open_controller(config_path, org).await?;
            let shutdown = async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!(%err, "failed to listen for Ctrl-C");
                }
            };
            watch::run(&mut stdout, &controller, shutdown).await?;
        }
        Commands::List(args) => {
            let (controller, _report) = open_controller(config_path, org).await?;
            list::run(&mut stdout, &controller, args, &tz)?;
        }
        Commands::Edit(args) => {
            let (mut controller, _report) = open_controller(config_path, org).await?;
            edit::run(&mut stdout, &mut controller, args, &tz).await?;
        }
        Commands::Delete(args) => {
            let (mut controller, _report) = open_controller(config_path, org).await?;
            delete::run(&mut stdout, &mut controller, args).await?;
        }
    }

    stdout.flush()?;
    Ok(())
}
