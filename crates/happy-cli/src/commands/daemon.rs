//! Daemon management commands (run, status, stop).

use colored::Colorize;
use happy_gateway::server::serve;
use happy_gateway::{DaemonPaths, GatewayServer};
use tokio_util::sync::CancellationToken;

use crate::daemon_client::DaemonClient;
use crate::theme::Theme;

/// Runs the daemon in the foreground. Used by `happy-daemon` directly, and
/// by `DaemonClient::connect`'s auto-start path.
pub(crate) async fn run_daemon() -> anyhow::Result<()> {
    let workspace_root = std::env::current_dir().ok();
    let server = GatewayServer::bootstrap(workspace_root.as_deref(), None).await?;
    let (handle, addr) = serve(server.clone()).await?;

    println!("{}", format!("Daemon listening on {addr}").cyan().bold());

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

    println!("{}", Theme::success("Daemon stopped"));
    Ok(())
}

/// Shows daemon status.
pub(crate) async fn daemon_status() -> anyhow::Result<()> {
    let paths = DaemonPaths::default_dir()?;

    if !crate::daemon_client::is_running(&paths) {
        println!("{}", Theme::warning("Daemon is not running"));
        return Ok(());
    }

    let client = DaemonClient::connect().await?;
    let status = client.daemon_status().await?;

    println!("\n{}", Theme::header("Daemon Status"));
    println!("  PID:      {}", status.pid.to_string().yellow());
    println!("  Version:  {}", status.version.cyan());
    println!("  Uptime:   {}s", status.uptime_secs.to_string().yellow());
    println!("  Sessions: {}", status.session_count.to_string().yellow());
    println!("  Hostname: {}", status.hostname);
    println!();

    Ok(())
}

/// Stops the daemon.
pub(crate) async fn daemon_stop() -> anyhow::Result<()> {
    let paths = DaemonPaths::default_dir()?;

    if !crate::daemon_client::is_running(&paths) {
        println!("{}", Theme::warning("Daemon is not running"));
        return Ok(());
    }

    let client = DaemonClient::connect().await?;
    client.daemon_shutdown().await?;
    println!("{}", Theme::success("Daemon shutdown requested"));

    Ok(())
}
