//! Chat command — interactive session via the daemon and a local Sync
//! Client connection.
//!
//! The daemon's loopback RPC (`DaemonClient`) only spawns/lists/stops
//! sessions — session traffic itself (the message log, approvals) never
//! crosses that surface. This process opens its own session-scoped Sync
//! Client, exactly the way a phone/web client would: user input is
//! published as a `Message` mutation, and the assistant's replies arrive
//! as `EntityUpdated` events on the same scope. See
//! `SessionRuntime::run_remote_input_loop` for the daemon side of this.

use std::io::Write as _;
use std::path::PathBuf;

use happy_core::protocol::{ConnectionKind, EntityRef, Scope};
use happy_core::types::SessionId;
use happy_core::{Message, MessageBody};
use happy_runtime::child::AssistantFlavor;
use happy_sync::{SyncClient, SyncClientConfig, SyncEvent};

use crate::commands::onboarding;
use crate::daemon_client::DaemonClient;
use crate::formatter::{create_formatter, OutputFormat, OutputFormatter};
use crate::theme::Theme;

/// Runs interactive chat: spawns (or attaches to) a session via the daemon,
/// then pumps stdin lines in and rendered messages out over a Sync Client
/// connection scoped to that session.
///
/// # Errors
///
/// Returns an error if the daemon can't be reached, the requested session
/// doesn't exist, or the local Sync Client connection never comes up.
pub(crate) async fn run_chat(session_id: Option<String>, workspace: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<()> {
    let flavor = AssistantFlavor::Claude;
    onboarding::check_assistant_available(flavor)?;

    let client = DaemonClient::connect().await?;

    let session_info = if let Some(id) = session_id {
        let wanted = SessionId::from_raw(&id);
        client
            .list_sessions()
            .await?
            .into_iter()
            .find(|s| s.id == wanted)
            .ok_or_else(|| anyhow::anyhow!("no running session `{id}`"))?
    } else {
        let working_dir = workspace.unwrap_or_else(|| PathBuf::from("."));
        client.spawn_session(working_dir, flavor.binary_name().to_string(), Vec::new()).await?
    };

    println!("Session: {} | Type {} to quit\n", Theme::session_id(session_info.id.as_str()), "exit");

    let sync = open_sync_client(&session_info.id)?;
    sync.wait_connected().await;

    let mut formatter = create_formatter(format);
    run_message_loop(&sync, &session_info.id, formatter.as_mut()).await
}

/// Resolves config/credentials the same way the daemon does
/// (`happy_gateway::config_bridge::resolve`) and opens a Sync Client
/// scoped to `session_id`. Unlike the daemon's own connections, this one
/// doesn't persist a resume cursor — it's a short-lived foreground
/// process, and each invocation is happy to re-derive its view from a
/// fresh snapshot.
fn open_sync_client(session_id: &SessionId) -> anyhow::Result<SyncClient> {
    let workspace_root = std::env::current_dir().ok();
    let context = happy_gateway::config_bridge::resolve(workspace_root.as_deref(), None)?;

    Ok(SyncClient::connect(SyncClientConfig {
        url: context.config.config.gateway.server_url.clone(),
        token: context.account_id.to_string(),
        connection_kind: ConnectionKind::SessionScoped { session_id: session_id.clone() },
        envelope_key: context.envelope_key,
        cursor_path: None,
    }))
}

/// Reads stdin lines, publishes each as a `User` message, and renders
/// every `Message` update this scope reports until stdin closes.
async fn run_message_loop(sync: &SyncClient, session_id: &SessionId, formatter: &mut dyn OutputFormatter) -> anyhow::Result<()> {
    let mut events = sync.subscribe(Scope::Session { id: session_id.clone() }).await;
    let mut stdin_lines = spawn_stdin_reader();

    loop {
        tokio::select! {
            line = stdin_lines.recv() => {
                let Some(line) = line else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                publish_user_message(sync, session_id, line).await?;
            },
            event = events.recv() => {
                match event {
                    Ok(SyncEvent::EntityUpdated { entity, .. }) => render_if_message(sync, session_id, &entity, formatter),
                    Ok(SyncEvent::ResyncRequired { .. } | SyncEvent::Resumed | SyncEvent::Ephemeral { .. }) => {},
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {},
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        formatter.error("connection to relay lost");
                        break;
                    },
                }
            },
        }
    }

    Ok(())
}

fn spawn_stdin_reader() -> tokio::sync::mpsc::Receiver<String> {
    let (tx, rx) = tokio::sync::mpsc::channel(16);
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            print!("> ");
            let _ = std::io::stdout().flush();
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.blocking_send(line.clone()).is_err() {
                        break;
                    }
                },
            }
        }
    });
    rx
}

async fn publish_user_message(sync: &SyncClient, session_id: &SessionId, text: &str) -> anyhow::Result<()> {
    let message = Message::new(session_id.clone(), MessageBody::UserText { text: text.to_string() });
    let entity = EntityRef::Message { session_id: session_id.clone(), message_id: message.id };
    let encoded = serde_json::to_vec(&message)?;
    sync.mutate(entity, move |_current| encoded.clone()).await?;
    Ok(())
}

fn render_if_message(sync: &SyncClient, session_id: &SessionId, entity: &EntityRef, formatter: &mut dyn OutputFormatter) {
    let EntityRef::Message { session_id: ref message_session, .. } = *entity else { return };
    if message_session != session_id {
        return;
    }
    let Some(body) = sync.peek(entity) else { return };
    match serde_json::from_slice::<Message>(&body) {
        Ok(message) if !matches!(message.body, MessageBody::UserText { .. }) => formatter.push(&message),
        Ok(_) => {},
        Err(error) => formatter.error(&format!("undecodable message: {error}")),
    }
}
