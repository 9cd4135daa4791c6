//! Project Tracker
//!
//! A personal project tracker served as a small web application: projects,
//! a Kanban task board, checklists, milestones and KPT retrospectives.

use anyhow::{Context, Result};
use clap::Parser;
use project_tracker::cli::{Cli, Command};
use project_tracker::config::{Config, Overrides};
use project_tracker::dashboard::{self, DashboardServer};
use project_tracker::db::Database;
use project_tracker::logging::{self, LogTarget};
use project_tracker::tracker::Tracker;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let serve_args = match &cli.command {
        Some(Command::Serve(args)) => Some(args),
        _ => None,
    };
    let overrides = Overrides {
        database: cli.database.clone(),
        host: serve_args.and_then(|a| a.host.clone()),
        port: serve_args.and_then(|a| a.port),
    };
    let config = Config::load(cli.config.as_deref(), &overrides)?;

    config.ensure_db_dir().with_context(|| {
        format!(
            "Failed to create directory for {}",
            config.database.path.display()
        )
    })?;
    let db = Arc::new(Database::open(&config.database.path)?);
    info!("Database opened at {}", config.database.path.display());

    let tracker = Tracker::new(Arc::clone(&db)).with_min_password_len(config.auth.min_password_len);

    match cli.command {
        Some(Command::InitDb) => {
            println!("Database ready at {}", config.database.path.display());
        }
        Some(Command::Metrics { project }) => {
            let overview = tracker
                .project_overview(project)
                .with_context(|| format!("Project not found: {}", project))?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        Some(Command::Serve(_)) | None => {
            run_server(config, tracker).await?;
        }
    }

    Ok(())
}

/// Serve the dashboard until Ctrl-C.
async fn run_server(config: Config, tracker: Tracker) -> Result<()> {
    let addr = config.bind_addr();
    let state = DashboardServer::new(tracker, config.auth);
    let (shutdown_tx, bound_addr) = dashboard::start_server(state, &addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    eprintln!("Project Tracker running at http://{}", bound_addr);

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");
    let _ = shutdown_tx.send(());
    Ok(())
}

