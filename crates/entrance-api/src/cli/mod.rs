//! CLI command definitions and dispatch for the `entrance` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod build;
pub mod catalog;
pub mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Build conversational agents from a goal, one confirmed step at a time.
#[derive(Parser)]
#[command(name = "entrance", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format: pretty or json.
    #[arg(long, global = true, default_value = "pretty", env = "ENTRANCE_LOG_FORMAT")]
    pub log_format: entrance_observe::LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive build for a new agent.
    Build {
        /// What the agent should do. Prompted for when omitted.
        goal: Option<String>,
    },

    /// Continue a build session where it stopped.
    Resume {
        /// Session id.
        id: Uuid,
    },

    /// List build sessions.
    #[command(alias = "ls")]
    Sessions {
        /// Include finished (archived) sessions.
        #[arg(long, short)]
        all: bool,
    },

    /// Show the current state of a session.
    Show {
        /// Session id.
        id: Uuid,
    },

    /// Show the version history of a session's configuration.
    History {
        /// Session id.
        id: Uuid,
    },

    /// Roll a session's configuration back to an earlier version.
    Rollback {
        /// Session id.
        id: Uuid,

        /// Version to restore.
        sequence: u64,
    },

    /// Delete a session and its history.
    #[command(alias = "rm")]
    Delete {
        /// Session id.
        id: Uuid,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        force: bool,
    },

    /// Validate a configuration file (JSON or TOML).
    Validate {
        /// Path to the configuration document.
        file: PathBuf,
    },

    /// List the tools skills may bind.
    Catalog,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Keep sessions in memory only.
        #[arg(long)]
        ephemeral: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_rollback_with_globals() {
        let id = Uuid::now_v7();
        let cli = Cli::try_parse_from([
            "entrance",
            "rollback",
            &id.to_string(),
            "3",
            "--json",
            "-vv",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Rollback { id: parsed, sequence: 3 } if parsed == id
        ));
    }

    #[test]
    fn build_goal_is_optional() {
        let cli = Cli::try_parse_from(["entrance", "build"]).unwrap();
        assert!(matches!(cli.command, Commands::Build { goal: None }));
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["entrance", "serve", "--ephemeral"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve { port: 3000, ref host, ephemeral: true } if host == "127.0.0.1"
        ));
    }

    #[test]
    fn malformed_session_id_is_rejected() {
        assert!(Cli::try_parse_from(["entrance", "show", "nope"]).is_err());
    }
}
