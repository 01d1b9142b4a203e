//! Sessions command — list/show/stop daemon-tracked sessions.

use colored::Colorize;
use happy_core::types::SessionId;

use crate::daemon_client::DaemonClient;
use crate::theme::Theme;

/// Lists every session the daemon currently tracks.
pub(crate) async fn list_sessions(client: &DaemonClient) -> anyhow::Result<()> {
    let sessions = client.list_sessions().await?;

    if sessions.is_empty() {
        println!("{}", Theme::info("No sessions found"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Active Sessions"));
    println!("{:>10} {:>8} {:>20} {}", "ID".dimmed(), "FLAVOR".dimmed(), "CREATED".dimmed(), "WORKSPACE".dimmed());
    println!("{}", Theme::separator());

    for session in sessions {
        println!(
            "{:>10} {:>8} {:>20} {}",
            Theme::session_id(session.id.as_str()),
            session.flavor,
            Theme::timestamp(&session.created_at),
            session.workspace.display().to_string().dimmed(),
        );
    }

    println!();
    Ok(())
}

/// Shows one session's details.
pub(crate) async fn show_session(client: &DaemonClient, id: &str) -> anyhow::Result<()> {
    let wanted = SessionId::from_raw(id);
    let Some(session) = client.list_sessions().await?.into_iter().find(|s| s.id == wanted) else {
        println!("{}", Theme::error(&format!("No session `{id}`")));
        return Ok(());
    };

    println!("\n{}", Theme::header("Session"));
    println!("  ID:        {}", session.id.as_str());
    println!("  Flavor:    {}", session.flavor);
    println!("  Workspace: {}", session.workspace.display());
    println!("  Created:   {}", Theme::timestamp(&session.created_at));
    println!();
    Ok(())
}

/// Stops a session.
pub(crate) async fn delete_session(client: &DaemonClient, id: &str) -> anyhow::Result<()> {
    client.stop_session(SessionId::from_raw(id)).await?;
    println!("{}", Theme::success(&format!("Stopped session {id}")));
    Ok(())
}
