//! The per-session message pump (spec §4.3, "Message pump").
//!
//! Single-producer (the remote user, via RPC or local terminal input),
//! single-consumer (the assistant child's stdin) queue keyed by a "mode
//! fingerprint". Adjacent messages sharing a fingerprint coalesce into one
//! batch; a fingerprint change, or one of the two flush-and-isolate
//! commands (`/clear`, `/compact`), forces a boundary.

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::child::PermissionMode;

/// The fingerprint a queued message is tagged with. Two adjacent messages
/// coalesce into one batch only when their fingerprints are equal (spec
/// §4.3: "keyed by a mode fingerprint (permission mode, model, allowed/
/// disallowed tools, system prompt overrides)").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFingerprint {
    /// Current permission mode.
    pub permission_mode: PermissionMode,
    /// Current model identifier, if overridden.
    pub model: Option<String>,
    /// Sorted list of explicitly allowed tool names.
    pub allowed_tools: Vec<String>,
    /// Sorted list of explicitly disallowed tool names.
    pub disallowed_tools: Vec<String>,
    /// System prompt override, if any.
    pub system_prompt: Option<String>,
}

impl ModeFingerprint {
    /// Builds a fingerprint from the currently-effective settings,
    /// normalizing tool lists so equal sets compare equal regardless of
    /// the order they were specified in.
    #[must_use]
    pub fn new(
        permission_mode: PermissionMode,
        model: Option<String>,
        mut allowed_tools: Vec<String>,
        mut disallowed_tools: Vec<String>,
        system_prompt: Option<String>,
    ) -> Self {
        allowed_tools.sort_unstable();
        disallowed_tools.sort_unstable();
        Self { permission_mode, model, allowed_tools, disallowed_tools, system_prompt }
    }
}

/// One item accepted by the pump, before it is classified.
#[derive(Debug, Clone)]
pub struct PumpInput {
    /// Raw text as typed or sent by the user.
    pub text: String,
    /// The fingerprint in effect when this input arrived.
    pub fingerprint: ModeFingerprint,
}

/// What the pump decided to do with one [`PumpInput`].
#[derive(Debug, Clone)]
pub enum PumpAction {
    /// Queued into (or started) a batch; not yet flushed.
    Queued,
    /// A batch of plain messages was flushed to the assistant.
    Flushed(Vec<String>),
    /// A flush-and-isolate command ran: any queued messages were
    /// discarded, then this command ran alone.
    FlushedIsolated { discarded: usize, command: String },
    /// A shell-prefix command short-circuited: it never reaches the
    /// assistant. Carries the rendered fenced-code-block output to push
    /// onto the session message log as an agent message.
    ShellResult { command: String, rendered: String },
}

/// Coalescing queue feeding one assistant child's stdin.
///
/// The queue itself has a single consumer (the child feeder task); this
/// type is not `Sync` across unsynchronized access from multiple
/// producers and is expected to sit behind a `Mutex` per spec §5 ("multiple
/// producers ... push under a mutex").
pub struct MessagePump {
    pending: Vec<String>,
    current_fingerprint: Option<ModeFingerprint>,
    shell_timeout: Duration,
}

impl MessagePump {
    /// Creates an empty pump with the given shell-command timeout.
    #[must_use]
    pub fn new(shell_timeout: Duration) -> Self {
        Self { pending: Vec::new(), current_fingerprint: None, shell_timeout }
    }

    /// Feeds one input into the pump, returning what the pump did.
    ///
    /// Shell-prefix commands (`$ ...` / `! ...`) are resolved entirely
    /// inside this call and never touch the pending queue.
    pub async fn feed(&mut self, input: PumpInput) -> PumpAction {
        if let Some(shell_cmd) = shell_command(&input.text) {
            let rendered = run_shell_command(shell_cmd, self.shell_timeout).await;
            return PumpAction::ShellResult { command: shell_cmd.to_string(), rendered };
        }

        if is_flush_and_isolate(&input.text) {
            let discarded = self.pending.len();
            self.pending.clear();
            self.current_fingerprint = None;
            return PumpAction::FlushedIsolated { discarded, command: input.text };
        }

        let boundary = self
            .current_fingerprint
            .as_ref()
            .is_some_and(|current| *current != input.fingerprint);

        if boundary {
            let flushed = std::mem::take(&mut self.pending);
            self.current_fingerprint = Some(input.fingerprint);
            self.pending.push(input.text);
            if flushed.is_empty() {
                return PumpAction::Queued;
            }
            return PumpAction::Flushed(flushed);
        }

        self.current_fingerprint = Some(input.fingerprint);
        self.pending.push(input.text);
        PumpAction::Queued
    }

    /// Flushes whatever is currently queued, e.g. on an idle timer or
    /// before the child is fed a tool result that depends on prior input.
    pub fn flush(&mut self) -> Option<Vec<String>> {
        if self.pending.is_empty() {
            return None;
        }
        self.current_fingerprint = None;
        Some(std::mem::take(&mut self.pending))
    }

    /// Number of messages currently queued.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn is_flush_and_isolate(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed == "/clear" || trimmed == "/compact"
}

/// Returns the shell command body if `text` carries a `$ ` or `! ` prefix.
fn shell_command(text: &str) -> Option<&str> {
    text.strip_prefix("$ ").or_else(|| text.strip_prefix("! ")).map(str::trim)
}

async fn run_shell_command(command: &str, timeout: Duration) -> String {
    let mut child = match tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => return format!("```bash\n$ {command}\nfailed to spawn shell: {err}\n```"),
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let mut body = String::from_utf8_lossy(&output.stdout).into_owned();
            if !output.stderr.is_empty() {
                body.push_str(&String::from_utf8_lossy(&output.stderr));
            }
            let mut rendered = format!("```bash\n$ {command}\n{body}\n```");
            if let Some(code) = output.status.code() {
                if code != 0 {
                    rendered.push_str(&format!("\n*Exit code: {code}*"));
                }
            }
            rendered
        },
        Ok(Err(err)) => format!("```bash\n$ {command}\nshell command failed: {err}\n```"),
        Err(_) => format!("```bash\n$ {command}\ntimed out after {timeout:?}\n```"),
    }
}

/// A running pump's handle, owned by the session runtime: the feeder task
/// reads from `inbound` and writes coalesced batches to the child's stdin.
pub struct PumpHandle {
    /// Producers push raw input here.
    pub inbound: mpsc::Sender<PumpInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(model: &str) -> ModeFingerprint {
        ModeFingerprint::new(PermissionMode::Default, Some(model.to_string()), vec![], vec![], None)
    }

    #[tokio::test]
    async fn adjacent_same_fingerprint_coalesces() {
        let mut pump = MessagePump::new(Duration::from_secs(5));
        let a = pump.feed(PumpInput { text: "one".into(), fingerprint: fp("m1") }).await;
        let b = pump.feed(PumpInput { text: "two".into(), fingerprint: fp("m1") }).await;
        assert!(matches!(a, PumpAction::Queued));
        assert!(matches!(b, PumpAction::Queued));
        assert_eq!(pump.pending_len(), 2);
    }

    #[tokio::test]
    async fn fingerprint_change_flushes_prior_batch() {
        let mut pump = MessagePump::new(Duration::from_secs(5));
        let _ = pump.feed(PumpInput { text: "one".into(), fingerprint: fp("m1") }).await;
        let action = pump.feed(PumpInput { text: "two".into(), fingerprint: fp("m2") }).await;
        match action {
            PumpAction::Flushed(batch) => assert_eq!(batch, vec!["one".to_string()]),
            other => panic!("expected flush, got {other:?}"),
        }
        assert_eq!(pump.pending_len(), 1);
    }

    #[tokio::test]
    async fn clear_discards_queued_and_isolates() {
        let mut pump = MessagePump::new(Duration::from_secs(5));
        let _ = pump.feed(PumpInput { text: "one".into(), fingerprint: fp("m1") }).await;
        let _ = pump.feed(PumpInput { text: "two".into(), fingerprint: fp("m1") }).await;
        let action = pump.feed(PumpInput { text: "/clear".into(), fingerprint: fp("m1") }).await;
        match action {
            PumpAction::FlushedIsolated { discarded, command } => {
                assert_eq!(discarded, 2);
                assert_eq!(command, "/clear");
            },
            other => panic!("expected isolated flush, got {other:?}"),
        }
        assert_eq!(pump.pending_len(), 0);
    }

    #[tokio::test]
    async fn shell_prefix_short_circuits_without_queueing() {
        let mut pump = MessagePump::new(Duration::from_secs(5));
        let action = pump.feed(PumpInput { text: "$ echo hi".into(), fingerprint: fp("m1") }).await;
        match action {
            PumpAction::ShellResult { command, rendered } => {
                assert_eq!(command, "echo hi");
                assert!(rendered.contains("hi"));
            },
            other => panic!("expected shell result, got {other:?}"),
        }
        assert_eq!(pump.pending_len(), 0);
    }

    #[tokio::test]
    async fn bang_prefix_is_also_a_shell_command() {
        let mut pump = MessagePump::new(Duration::from_secs(5));
        let action = pump.feed(PumpInput { text: "! true".into(), fingerprint: fp("m1") }).await;
        assert!(matches!(action, PumpAction::ShellResult { .. }));
    }

    #[test]
    fn fingerprint_normalizes_tool_order() {
        let a = ModeFingerprint::new(
            PermissionMode::Default,
            None,
            vec!["b".into(), "a".into()],
            vec![],
            None,
        );
        let b = ModeFingerprint::new(
            PermissionMode::Default,
            None,
            vec!["a".into(), "b".into()],
            vec![],
            None,
        );
        assert_eq!(a, b);
    }
}
