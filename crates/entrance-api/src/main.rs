//! Entrance CLI and REST API entry point.
//!
//! Binary name: `entrance`
//!
//! Parses CLI arguments, initializes storage and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let directive = entrance_observe::default_directive(cli.verbose, cli.quiet);
    entrance_observe::init_tracing(cli.log_format, directive)
        .map_err(|e| anyhow::anyhow!(e))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "entrance", &mut std::io::stdout());
        return Ok(());
    }

    let ephemeral = matches!(cli.command, Commands::Serve { ephemeral: true, .. });

    // Initialize application state (DB, services)
    let state = AppState::init(ephemeral).await?;

    match cli.command {
        Commands::Build { goal } => {
            cli::build::run_build(&state, goal, cli.json).await?;
        }

        Commands::Resume { id } => {
            cli::build::run_resume(&state, id, cli.json).await?;
        }

        Commands::Sessions { all } => {
            cli::session::list_sessions(&state, all, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::session::show_session(&state, id, cli.json).await?;
        }

        Commands::History { id } => {
            cli::session::show_history(&state, id, cli.json).await?;
        }

        Commands::Rollback { id, sequence } => {
            cli::session::rollback(&state, id, sequence, cli.json).await?;
        }

        Commands::Delete { id, force } => {
            cli::session::delete_session(&state, id, force, cli.json).await?;
        }

        Commands::Validate { file } => {
            cli::catalog::validate_file(&state, &file, cli.json).await?;
        }

        Commands::Catalog => {
            cli::catalog::list_catalog(&state, cli.json)?;
        }

        Commands::Serve {
            port,
            host,
            ephemeral,
        } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} Entrance API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}/api/v1")).cyan()
                );
                if ephemeral {
                    println!(
                        "  {}",
                        console::style("Ephemeral mode: sessions are kept in memory only").yellow()
                    );
                } else {
                    println!(
                        "  {}",
                        console::style(format!("Data directory: {}", state.data_dir.display())).dim()
                    );
                }
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
