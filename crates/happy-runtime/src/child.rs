//! Spawns and supervises the assistant child process (spec §4.3,
//! "Child-process lifecycle").
//!
//! The assistant itself — Claude Code, Codex, or Gemini — is an opaque
//! subprocess: this module never interprets its output semantically, it
//! only adapts its stdio surface into a stream of [`ChildEvent`]s the
//! message pump and sync layer can publish as protocol messages. Each
//! flavor is assumed to speak one JSON object per line on stdout (the
//! `--output-format stream-json`-style contract every one of the three
//! real CLIs exposes); stderr is captured for diagnostics only and never
//! parsed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use happy_core::env_policy::is_blocked_spawn_env;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RuntimeError, RuntimeResult};

/// Which coding assistant a session runs (spec §3, `flavor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantFlavor {
    /// Claude Code.
    Claude,
    /// OpenAI Codex.
    Codex,
    /// Google Gemini.
    Gemini,
}

impl AssistantFlavor {
    /// The binary name looked up on `PATH`.
    #[must_use]
    pub const fn binary_name(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
        }
    }

    /// The env var this flavor reads for its default model (spec §6).
    #[must_use]
    pub const fn model_env_var(self) -> &'static str {
        match self {
            Self::Claude => "ANTHROPIC_MODEL",
            Self::Codex => "OPENAI_MODEL",
            Self::Gemini => "GEMINI_MODEL",
        }
    }

    /// Resolves this flavor's display name, e.g. for a `happy <flavor>` CLI arg.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "claude" => Some(Self::Claude),
            "codex" => Some(Self::Codex),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssistantFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Policy governing which of the assistant's tool calls require user
/// consent (spec GLOSSARY, "Permission mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionMode {
    /// Every gated tool call requires an explicit decision.
    Default,
    /// Plan-only tool calls (read-only) are auto-approved locally; anything
    /// else still prompts (spec §4.3, "auto-approve-plan bit").
    AutoApprovePlan,
    /// Nothing is gated; every tool call proceeds without a prompt. Only
    /// meant for fully sandboxed or disposable workspaces.
    BypassPermissions,
}

/// Sandbox posture applied to the spawned child (spec §4.3, "sandbox/
/// permission flags are computed from the session's initial permission
/// mode and sandbox config").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Deny filesystem writes outside the workspace root.
    pub restrict_writes_to_workspace: bool,
    /// Deny outbound network access entirely.
    pub deny_network: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self { restrict_writes_to_workspace: true, deny_network: false }
    }
}

/// Everything needed to spawn one assistant child.
pub struct SpawnConfig {
    /// Which assistant to run.
    pub flavor: AssistantFlavor,
    /// Working directory the child is launched in.
    pub working_dir: PathBuf,
    /// Extra CLI args (e.g. `--model`, `--permission-mode`).
    pub extra_args: Vec<String>,
    /// Model override; falls back to the flavor's env var default if unset.
    pub model: Option<String>,
    /// Initial permission mode.
    pub permission_mode: PermissionMode,
    /// Sandbox posture.
    pub sandbox: SandboxConfig,
    /// URL of the local tool-extension (MCP) server the child should call
    /// into for `read_file`/`write_file`/`bash`/`list_files`.
    pub tool_extension_url: String,
    /// URL of the local hook server the child posts lifecycle hooks to.
    pub hook_server_url: String,
    /// A shared secret the child includes on tool/hook requests, proving it
    /// is the process this daemon spawned rather than an unrelated caller.
    pub hook_token: String,
}

/// One line of structured output from the assistant child, translated 1:1
/// from its stdout stream-JSON protocol. Variants are closed: the three
/// supported flavors are adapted to exactly this shape and nothing richer
/// (spec §9, "polymorphic message kinds ... variants are closed").
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChildLine {
    Text { text: String },
    ToolCall { id: String, name: String, arguments: serde_json::Value },
    ToolResult { id: String, output: String, is_error: bool },
    Event { kind: String, #[serde(default)] usage: Option<UsageStats> },
}

/// Cumulative token/cost usage reported by the assistant, carried on the
/// final `ready` event (spec §4.3, "ready event with cumulative usage
/// stats").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Input tokens consumed this session.
    pub input_tokens: u64,
    /// Output tokens produced this session.
    pub output_tokens: u64,
}

/// One event translated from the child's stdio surface. The message pump
/// turns each of these into exactly one protocol [`happy_core::Message`].
#[derive(Debug, Clone)]
pub enum ChildEvent {
    /// A chunk of assistant-authored text.
    TextChunk(String),
    /// The assistant is invoking a tool.
    ToolCall { id: String, name: String, arguments: serde_json::Value },
    /// A tool invocation completed.
    ToolResult { id: String, output: String, is_error: bool },
    /// An out-of-band agent event (mode switch, limit reached, ...).
    AgentEvent(AgentEventKind),
    /// The child reported cumulative usage and is idle (spec §4.3, "final
    /// `ready` event with cumulative usage stats").
    Ready(UsageStats),
    /// The child process exited.
    Exit { code: Option<i32> },
    /// A line on stdout could not be parsed; carried through rather than
    /// dropped so the pump can at least surface it as diagnostic text.
    Unparsed(String),
}

/// Closed set of agent-event kinds the spec names explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEventKind {
    /// The assistant switched operating mode (e.g. plan → build).
    SwitchMode(String),
    /// A rate or usage limit was reached.
    LimitReached,
    /// Any event kind not in the closed set above; carried as-is rather
    /// than dropped, since the assistant's event vocabulary may grow.
    Other(String),
}

impl From<&str> for AgentEventKind {
    fn from(kind: &str) -> Self {
        match kind {
            "limit-reached" => Self::LimitReached,
            other if other.starts_with("switch-mode:") => {
                Self::SwitchMode(other.trim_start_matches("switch-mode:").to_string())
            },
            other => Self::Other(other.to_string()),
        }
    }
}

/// Owns one spawned assistant child: its stdio pump tasks and a handle to
/// write further input and to terminate it.
pub struct ChildSupervisor {
    child: Child,
    stdin_tx: mpsc::Sender<String>,
    events_rx: mpsc::Receiver<ChildEvent>,
    cancellation: CancellationToken,
}

impl ChildSupervisor {
    /// Spawns the assistant binary and starts its stdio pump tasks.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::AssistantNotFound`] if the flavor's binary
    /// isn't on `PATH`, or [`RuntimeError::SpawnFailed`] if `exec` fails.
    pub fn spawn(config: SpawnConfig) -> RuntimeResult<Self> {
        let binary = which::which(config.flavor.binary_name())
            .map_err(|_| RuntimeError::AssistantNotFound(config.flavor.binary_name().to_string()))?;

        let mut command = Command::new(&binary);
        command
            .current_dir(&config.working_dir)
            .args(&config.extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command.env_clear();
        for (key, value) in std::env::vars() {
            if !is_blocked_spawn_env(&key) {
                command.env(key, value);
            }
        }
        command.env("HOME", std::env::var("HOME").unwrap_or_default());
        command.env("PATH", std::env::var("PATH").unwrap_or_default());
        command.env("HAPPY_TOOL_EXTENSION_URL", &config.tool_extension_url);
        command.env("HAPPY_HOOK_SERVER_URL", &config.hook_server_url);
        command.env("HAPPY_HOOK_TOKEN", &config.hook_token);
        if let Some(model) = &config.model {
            command.env(config.flavor.model_env_var(), model);
        }
        if config.sandbox.deny_network {
            command.env("HAPPY_SANDBOX_DENY_NETWORK", "1");
        }

        info!(
            flavor = %config.flavor,
            workspace = %config.working_dir.display(),
            permission_mode = ?config.permission_mode,
            "spawning assistant child"
        );

        let mut child = command.spawn().map_err(RuntimeError::SpawnFailed)?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(64);
        let (events_tx, events_rx) = mpsc::channel::<ChildEvent>(256);
        let cancellation = CancellationToken::new();

        // stdin writer: single consumer feeding the child, matching the
        // message pump's single-consumer contract (spec §4.3).
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = stdin_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.write_all(b"\n").await.is_err() {
                    break;
                }
                let _ = stdin.flush().await;
            }
        });

        // stdout pump: one task, arrival order preserved (spec §5).
        let events_tx_stdout = events_tx.clone();
        let cancel_stdout = cancellation.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    () = cancel_stdout.cancelled() => break,
                    line = lines.next_line() => {
                        match line {
                            Ok(Some(line)) if line.trim().is_empty() => {},
                            Ok(Some(line)) => {
                                let event = parse_child_line(&line);
                                if events_tx_stdout.send(event).await.is_err() {
                                    break;
                                }
                            },
                            Ok(None) => break,
                            Err(err) => {
                                warn!(%err, "error reading assistant stdout");
                                break;
                            },
                        }
                    }
                }
            }
        });

        // stderr pump: diagnostics only, never parsed or forwarded as a
        // protocol message (spec §7: the CLI never writes non-assistant
        // output to its terminal while a session is live — it only logs).
        let cancel_stderr = cancellation.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                tokio::select! {
                    () = cancel_stderr.cancelled() => break,
                    line = lines.next_line() => {
                        match line {
                            Ok(Some(line)) => debug!(target: "assistant.stderr", "{line}"),
                            _ => break,
                        }
                    }
                }
            }
        });

        Ok(Self { child, stdin_tx, events_rx, cancellation })
    }

    /// Sends one line of input to the assistant's stdin.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ChildGone`] if the stdin pump has already
    /// exited (the child died or was killed).
    pub async fn send_input(&self, session: &happy_core::SessionId, line: &str) -> RuntimeResult<()> {
        self.stdin_tx
            .send(line.to_string())
            .await
            .map_err(|_| RuntimeError::ChildGone(session.clone()))
    }

    /// Receives the next translated child event. Returns `None` once the
    /// stdout pump has exited (the child closed stdout or died).
    pub async fn next_event(&mut self) -> Option<ChildEvent> {
        self.events_rx.recv().await
    }

    /// Waits for the child to exit, returning its exit code.
    ///
    /// # Errors
    ///
    /// Returns an IO error if waiting on the process fails.
    pub async fn wait(&mut self) -> RuntimeResult<Option<i32>> {
        let status = self.child.wait().await.map_err(RuntimeError::IoError)?;
        Ok(status.code())
    }

    /// Sends a termination signal and waits up to `grace` before a hard
    /// kill (spec §4.3, "kills the child with a grace period").
    pub async fn terminate(&mut self, grace: Duration) {
        self.cancellation.cancel();
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            // SAFETY: no unsafe here — `nix` wraps the raw `kill(2)` call.
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX)),
                nix::sys::signal::Signal::SIGTERM,
            );
        }
        let exited = tokio::time::timeout(grace, self.child.wait()).await;
        if exited.is_err() {
            warn!("assistant child did not exit within grace period, killing");
            let _ = self.child.kill().await;
        }
    }
}

fn parse_child_line(line: &str) -> ChildEvent {
    match serde_json::from_str::<ChildLine>(line) {
        Ok(ChildLine::Text { text }) => ChildEvent::TextChunk(text),
        Ok(ChildLine::ToolCall { id, name, arguments }) => ChildEvent::ToolCall { id, name, arguments },
        Ok(ChildLine::ToolResult { id, output, is_error }) => ChildEvent::ToolResult { id, output, is_error },
        Ok(ChildLine::Event { kind, usage }) => {
            if kind == "ready" {
                ChildEvent::Ready(usage.unwrap_or_default())
            } else {
                ChildEvent::AgentEvent(AgentEventKind::from(kind.as_str()))
            }
        },
        Err(_) => ChildEvent::Unparsed(line.to_string()),
    }
}

/// Builds the hook-settings overlay a real CLI invocation writes to a temp
/// file and passes to the assistant via its own config mechanism, pointing
/// it at the tool-extension and hook servers (spec §4.3 step 5).
#[must_use]
pub fn hook_settings_env(config: &SpawnConfig) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("HAPPY_TOOL_EXTENSION_URL".to_string(), config.tool_extension_url.clone());
    env.insert("HAPPY_HOOK_SERVER_URL".to_string(), config.hook_server_url.clone());
    env.insert("HAPPY_HOOK_TOKEN".to_string(), config.hook_token.clone());
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavor_binary_and_env_var_match_spec_table() {
        assert_eq!(AssistantFlavor::Claude.binary_name(), "claude");
        assert_eq!(AssistantFlavor::Claude.model_env_var(), "ANTHROPIC_MODEL");
        assert_eq!(AssistantFlavor::Codex.model_env_var(), "OPENAI_MODEL");
        assert_eq!(AssistantFlavor::Gemini.model_env_var(), "GEMINI_MODEL");
    }

    #[test]
    fn flavor_parses_from_cli_arg() {
        assert_eq!(AssistantFlavor::parse("codex"), Some(AssistantFlavor::Codex));
        assert_eq!(AssistantFlavor::parse("bogus"), None);
    }

    #[test]
    fn parses_text_line() {
        let event = parse_child_line(r#"{"type":"text","text":"hello"}"#);
        assert!(matches!(event, ChildEvent::TextChunk(t) if t == "hello"));
    }

    #[test]
    fn parses_ready_event_with_usage() {
        let event = parse_child_line(
            r#"{"type":"event","kind":"ready","usage":{"input_tokens":10,"output_tokens":20}}"#,
        );
        match event {
            ChildEvent::Ready(usage) => {
                assert_eq!(usage.input_tokens, 10);
                assert_eq!(usage.output_tokens, 20);
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unparsable_line_is_carried_not_dropped() {
        let event = parse_child_line("not json");
        assert!(matches!(event, ChildEvent::Unparsed(_)));
    }

    #[test]
    fn agent_event_kind_recognizes_limit_reached() {
        assert_eq!(AgentEventKind::from("limit-reached"), AgentEventKind::LimitReached);
        assert_eq!(
            AgentEventKind::from("switch-mode:plan"),
            AgentEventKind::SwitchMode("plan".to_string())
        );
        assert_eq!(AgentEventKind::from("something-else"), AgentEventKind::Other("something-else".to_string()));
    }
}
