//! `happy-daemon` — standalone daemon binary for the Happy secure agent
//! runtime.
//!
//! This is a thin entry point that runs the daemon server directly using
//! `happy-gateway`. It exists so that `ps` and process managers show a
//! distinct `happy-daemon` process name, and so `DaemonClient::connect`
//! has a binary to auto-start. The logic here mirrors `happy chat`'s own
//! `happy daemon run` subcommand.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use happy_gateway::server::serve;
use happy_gateway::GatewayServer;
use tokio_util::sync::CancellationToken;

/// Happy Daemon — background agent runtime server.
#[derive(Parser)]
#[command(name = "happy-daemon")]
#[command(author, version, about = "Happy daemon — background agent runtime server")]
struct Args {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let log_config = happy_telemetry::LogConfig::new(level).with_format(happy_telemetry::LogFormat::Compact);
    if let Err(e) = happy_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let workspace_root = std::env::current_dir().ok();
    let server = GatewayServer::bootstrap(workspace_root.as_deref(), None).await?;
    let (handle, addr) = serve(server.clone()).await?;

    println!("{}", format!("happy-daemon listening on {addr}").cyan().bold());

    let cancellation = CancellationToken::new();
    let heartbeat = tokio::spawn(server.clone().run_heartbeat_loop(cancellation.clone()));
    let config_watch = tokio::spawn(server.clone().run_config_watch_loop(cancellation.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
    }

    println!("\n{}", "Shutting down daemon...".yellow());
    cancellation.cancel();
    heartbeat.abort();
    config_watch.abort();
    server.shutdown().await;
    handle.stop()?;
    handle.stopped().await;

    println!("{}", "Daemon stopped".green().bold());
    Ok(())
}
