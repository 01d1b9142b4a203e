//! First-run check: is a coding assistant binary actually reachable.
//!
//! There is no "Happy talks to an LLM provider" step to onboard — the
//! daemon spawns the real `claude`/`codex`/`gemini` CLI and that binary
//! manages its own provider auth (spec §4.3, `ChildSupervisor::spawn`).
//! All this module does is give a friendlier message than a raw
//! [`happy_runtime::RuntimeError::AssistantNotFound`] the first time chat
//! mode can't find the configured flavor's binary on `PATH`.

use colored::Colorize;
use happy_runtime::child::AssistantFlavor;

use crate::theme::Theme;

/// Returns `Ok(())` if `flavor`'s binary is on `PATH`, otherwise prints
/// install guidance and returns an error describing the missing binary.
pub(crate) fn check_assistant_available(flavor: AssistantFlavor) -> anyhow::Result<()> {
    let binary = flavor.binary_name();
    if which::which(binary).is_ok() {
        return Ok(());
    }

    println!("\n{}", Theme::warning(&format!("Can't find `{binary}` on PATH")));
    println!("  {} needs the {} CLI installed and authenticated on its own.", "happy".bold(), binary.cyan());
    println!("  {}", install_hint(flavor));
    println!();

    anyhow::bail!("assistant binary `{binary}` not found on PATH")
}

fn install_hint(flavor: AssistantFlavor) -> &'static str {
    match flavor {
        AssistantFlavor::Claude => "Install it from https://claude.com/claude-code, then run `claude` once to sign in.",
        AssistantFlavor::Codex => "Install it from https://github.com/openai/codex, then run `codex login`.",
        AssistantFlavor::Gemini => "Install it from https://github.com/google-gemini/gemini-cli, then sign in on first run.",
    }
}
