//! Doctor command — quick health check from the CLI's point of view.

use colored::Colorize;
use happy_gateway::DaemonPaths;
use happy_runtime::child::AssistantFlavor;

use crate::daemon_client::{self, DaemonClient};

/// Runs a handful of local checks: config loads, the daemon is reachable,
/// and each known assistant binary is on `PATH`.
pub(crate) async fn run_doctor() -> anyhow::Result<()> {
    println!("{}", "Happy Doctor — System Health Check".cyan().bold());
    println!();

    print!("  Checking configuration... ");
    let workspace_root = std::env::current_dir().ok();
    match happy_config::loader::load(workspace_root.as_deref(), None) {
        Ok(config) => {
            println!("{}", "OK".green());
            println!("    Relay: {}", config.config.gateway.server_url);
        },
        Err(e) => println!("{} ({e})", "FAIL".red()),
    }

    print!("  Checking daemon... ");
    match DaemonPaths::default_dir() {
        Ok(paths) if daemon_client::is_running(&paths) => match DaemonClient::connect().await {
            Ok(client) => match client.daemon_status().await {
                Ok(status) => println!("{} (pid {}, {} session(s))", "OK".green(), status.pid, status.session_count),
                Err(e) => println!("{} ({e})", "WARN".yellow()),
            },
            Err(e) => println!("{} ({e})", "WARN".yellow()),
        },
        Ok(_) => println!("{} (not running; auto-starts on `happy chat`)", "INFO".dimmed()),
        Err(e) => println!("{} ({e})", "FAIL".red()),
    }

    println!("\n{}", "Assistant binaries:".cyan());
    for flavor in [AssistantFlavor::Claude, AssistantFlavor::Codex, AssistantFlavor::Gemini] {
        let name = flavor.binary_name();
        print!("  {name}... ");
        if which::which(name).is_ok() {
            println!("{}", "OK".green());
        } else {
            println!("{}", "not found".dimmed());
        }
    }

    println!();
    Ok(())
}
