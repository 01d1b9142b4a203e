//! Renders the session's `Message` stream to the terminal.
//!
//! Two formats: `Pretty` colorizes role-tagged text for a human at a
//! keyboard; `Json` emits one NDJSON object per message for piping into
//! another tool. Both are driven the same way — one `push` call per
//! `Message` entity this process observes — there is no separate TUI
//! rendering path in this lineage.

use colored::Colorize;
use happy_core::{AgentEvent, Message, MessageBody};
use serde::Serialize;

use crate::theme::Theme;

/// Output rendering mode, selected by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Colorized, human-readable.
    Pretty,
    /// One JSON object per message, newline-delimited.
    Json,
}

/// Renders messages arriving on a session's scope.
pub(crate) trait OutputFormatter: Send {
    /// Renders one message.
    fn push(&mut self, message: &Message);
    /// Renders a local/transport error that isn't itself a `Message`.
    fn error(&mut self, text: &str);
}

/// Builds the formatter for `format`.
pub(crate) fn create_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Pretty => Box::new(PrettyFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

struct PrettyFormatter;

impl OutputFormatter for PrettyFormatter {
    fn push(&mut self, message: &Message) {
        match &message.body {
            MessageBody::UserText { text } => println!("{} {}", "›".cyan(), text),
            MessageBody::AgentText { text } => println!("{text}"),
            MessageBody::ToolCall(call) => {
                if let Some(output) = &call.output {
                    let marker = if call.is_error { "✗".red() } else { "»".dimmed() };
                    println!("  {marker} {}({}) -> {}", call.name, call.arguments, output.dimmed());
                } else {
                    println!("  {} {}({})", "»".dimmed(), call.name, call.arguments);
                }
            },
            MessageBody::AgentEvent(event) => println!("{}", Theme::dimmed(&format_agent_event(event))),
        }
    }

    fn error(&mut self, text: &str) {
        println!("{}", Theme::error(text));
    }
}

fn format_agent_event(event: &AgentEvent) -> String {
    match event {
        AgentEvent::SwitchMode { mode } => format!("switched mode: {mode}"),
        AgentEvent::LimitReached => "usage limit reached".to_string(),
        AgentEvent::ReadyWithUsage { input_tokens, output_tokens } => {
            format!("ready (usage: {input_tokens} in / {output_tokens} out)")
        },
        AgentEvent::SessionDeath => "session ended".to_string(),
        AgentEvent::Other { kind } => kind.clone(),
    }
}

struct JsonFormatter;

#[derive(Serialize)]
struct JsonMessage<'a> {
    #[serde(flatten)]
    body: &'a MessageBody,
    created_at: i64,
}

#[derive(Serialize)]
struct JsonError<'a> {
    error: &'a str,
}

impl OutputFormatter for JsonFormatter {
    fn push(&mut self, message: &Message) {
        let line = JsonMessage { body: &message.body, created_at: message.created_at.as_millis() };
        if let Ok(encoded) = serde_json::to_string(&line) {
            println!("{encoded}");
        }
    }

    fn error(&mut self, text: &str) {
        if let Ok(encoded) = serde_json::to_string(&JsonError { error: text }) {
            println!("{encoded}");
        }
    }
}
