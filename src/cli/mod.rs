//! CLI command definitions for project-tracker.
//!
//! This module defines the CLI structure using clap's derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Personal project tracker: web UI and maintenance commands
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the secrets file (default: .project-tracker/secrets.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web UI (default if no subcommand given)
    Serve(ServeArgs),

    /// Create the database and apply migrations, then exit
    InitDb,

    /// Print a project's task metrics as JSON
    Metrics {
        /// Project id
        #[arg(long)]
        project: i64,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides config)
    #[arg(long)]
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["project-tracker"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "project-tracker",
            "serve",
            "--port",
            "9000",
            "--database",
            "t.db",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.database, Some(PathBuf::from("t.db")));
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.port, Some(9000)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn metrics_requires_project() {
        assert!(Cli::try_parse_from(["project-tracker", "metrics"]).is_err());
        let cli = Cli::try_parse_from(["project-tracker", "metrics", "--project", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Metrics { project: 3 })));
    }
}
