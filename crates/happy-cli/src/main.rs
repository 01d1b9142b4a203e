//! Happy CLI - Secure Agent Runtime
//!
//! A production-grade secure agent runtime with proper security from day one.
//! The CLI is a thin client: it connects to the daemon (auto-starting if needed),
//! creates/resumes sessions, and renders streaming events.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
pub mod config_bridge;
pub mod daemon_client;
mod formatter;
mod theme;

use commands::{audit, chat, daemon, doctor, init, keys, onboarding, sessions};
use daemon_client::DaemonClient;
use theme::print_banner;

/// Happy - Secure Agent Runtime
#[derive(Parser)]
#[command(name = "happy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty (default) or json
    #[arg(long, global = true, default_value = "pretty")]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume a specific session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Manage the background daemon
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },

    /// Run system health checks
    Doctor,

    /// Manage sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// View and verify audit logs
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// Manage cryptographic keys
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Initialize a workspace
    Init,
}

#[derive(Subcommand)]
enum DaemonCommands {
    /// Start the daemon (foreground, used by auto-start)
    Run,
    /// Show daemon status
    Status,
    /// Stop the daemon
    Stop,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List all sessions tracked by the daemon
    List,
    /// Show session details
    Show {
        /// Session ID
        id: String,
    },
    /// Stop a session
    Delete {
        /// Session ID
        id: String,
    },
}

#[derive(Subcommand)]
enum AuditCommands {
    /// List audit sessions
    List,
    /// Show audit entries for a session
    Show {
        /// Session ID
        session_id: String,
    },
    /// Verify audit chain integrity
    Verify {
        /// Session ID (optional, verifies all if not provided)
        session_id: Option<String>,
    },
    /// Show audit statistics
    Stats,
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Show the current key (public key and key ID)
    Show,
    /// Generate a new key (prompts if one already exists)
    Generate {
        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Ensure the global config directory and `config.toml` exist.
///
/// Returns `true` if this is a first run (config was just created).
fn ensure_global_config() -> bool {
    let Ok(home) = happy_core::dirs::HappyHome::resolve() else {
        return false;
    };

    if let Err(e) = home.ensure() {
        eprintln!("Warning: could not create ~/.happy directory: {e}");
        return false;
    }

    let config_path = home.config_path();
    if config_path.exists() {
        return false;
    }

    // Write a commented template so users know what's available.
    let template = r#"# Happy configuration
# Documentation: https://github.com/happy-rs/happy
#
# This file was auto-created on first run. Uncomment and edit as needed.

[model]
# provider = "claude"
# model = "claude-sonnet-4-20250514"
# max_tokens = 4096
# temperature = 0.7

[gateway]
# server_url = "wss://relay.happy.engineering"

[budget]
# session_max_usd = 5.0
# per_action_max_usd = 0.50

[security.policy]
# require_approval_for_delete = true
# require_approval_for_network = false
"#;

    if let Err(e) = std::fs::write(&config_path, template) {
        eprintln!("Warning: could not create {}: {e}", config_path.display());
        return false;
    }

    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load unified config for logging setup.
    let workspace_root = std::env::current_dir().ok();
    let unified_cfg = happy_config::loader::load(workspace_root.as_deref(), None).ok();

    // Set up logging from config, with --verbose override.
    let log_config = if let Some(cfg) = &unified_cfg {
        let mut lc = config_bridge::to_log_config(&cfg.config);
        if cli.verbose {
            "debug".clone_into(&mut lc.level);
        }
        lc
    } else {
        // Fallback if config loading fails.
        let level = if cli.verbose { "debug" } else { "info" };
        happy_telemetry::LogConfig::new(level).with_format(happy_telemetry::LogFormat::Compact)
    };
    if let Err(e) = happy_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    // Parse output format.
    let output_format = match cli.format.as_str() {
        "json" => formatter::OutputFormat::Json,
        _ => formatter::OutputFormat::Pretty,
    };

    // Handle commands
    match cli.command {
        Some(Commands::Chat { session }) => {
            if output_format == formatter::OutputFormat::Json {
                // JSON mode: print banner to stderr for piping.
                print_banner();
            }
            ensure_global_config();
            let workspace = std::env::current_dir().ok();
            chat::run_chat(session, workspace, output_format).await?;
        },
        Some(Commands::Daemon { command }) => {
            handle_daemon(command).await?;
        },
        Some(Commands::Doctor) => {
            doctor::run_doctor().await?;
        },
        Some(Commands::Sessions { command }) => {
            handle_sessions(command).await?;
        },
        Some(Commands::Audit { command }) => {
            handle_audit(command)?;
        },
        Some(Commands::Keys { command }) => {
            handle_keys(&command)?;
        },
        Some(Commands::Init) => {
            init::run_init()?;
        },
        None => {
            // Default to chat mode.
            if output_format == formatter::OutputFormat::Json {
                print_banner();
            }
            ensure_global_config();
            let workspace = std::env::current_dir().ok();
            chat::run_chat(None, workspace, output_format).await?;
        },
    }

    Ok(())
}

async fn handle_daemon(command: DaemonCommands) -> Result<()> {
    match command {
        DaemonCommands::Run => daemon::run_daemon().await,
        DaemonCommands::Status => daemon::daemon_status().await,
        DaemonCommands::Stop => daemon::daemon_stop().await,
    }
}

async fn handle_sessions(command: SessionCommands) -> Result<()> {
    let client = DaemonClient::connect().await?;

    match command {
        SessionCommands::List => sessions::list_sessions(&client).await,
        SessionCommands::Show { id } => sessions::show_session(&client, &id).await,
        SessionCommands::Delete { id } => sessions::delete_session(&client, &id).await,
    }
}

fn handle_audit(command: AuditCommands) -> Result<()> {
    use happy_audit::AuditLog;
    use happy_core::dirs::HappyHome;
    use happy_crypto::KeyPair;

    let home = HappyHome::resolve()?;
    home.ensure()?;

    let key = KeyPair::load_or_generate(home.user_key_path())?;
    let log = AuditLog::open(home.audit_db_path(), key)?;

    match command {
        AuditCommands::List => audit::list_audit_sessions(&log),
        AuditCommands::Show { session_id } => audit::show_audit_entries(&log, &session_id),
        AuditCommands::Verify { session_id } => audit::verify_audit_chain(&log, session_id.as_deref()),
        AuditCommands::Stats => audit::show_audit_stats(&log),
    }
}

fn handle_keys(command: &KeyCommands) -> Result<()> {
    match command {
        KeyCommands::Show => keys::show_key(),
        KeyCommands::Generate { force } => keys::generate_key(*force),
    }
}
