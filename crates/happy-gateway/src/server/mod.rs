//! The daemon process: machine/identity bootstrap, session lifecycle, and
//! the loopback jsonrpsee server exposing the local control surface (spec
//! §4.3, "Daemon surface").
//!
//! # Locking Design
//!
//! The resolved [`GatewayContext`] is immutable after bootstrap and never
//! locked. Sessions live behind [`SessionManager`]'s own brief-hold
//! `RwLock<HashMap<...>>`; each session's actual state is owned by its
//! `SessionRuntime`, which does its own fine-grained locking. This keeps a
//! long-running session turn from ever blocking `listSessions` or a
//! concurrent `spawnSession`.

pub mod paths;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use happy_core::entities::{Machine, MachineStatus, Session};
use happy_core::protocol::{ConnectionKind, EntityRef};
use happy_runtime::child::{AssistantFlavor, SpawnConfig};
use happy_runtime::hook_server::{HookEvent, HookServerState};
use happy_runtime::permission::PermissionGate;
use happy_runtime::session::SessionRuntime;
use happy_runtime::store::LocalSessionStore;
use happy_runtime::tool_server::{ToolServer, ToolServerConfig};
use happy_sync::{SyncClient, SyncClientConfig};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use paths::DaemonPaths;

use crate::config_bridge::{self, GatewayContext};
use crate::error::{GatewayError, GatewayResult};
use crate::manager::{SessionHandle, SessionManager};
use crate::rpc::{parse_flavor, DaemonStatus, HappyRpcServer, SessionInfo};

/// One running daemon process.
pub struct GatewayServer {
    context: GatewayContext,
    sessions: Arc<SessionManager>,
    paths: DaemonPaths,
    started_at: Instant,
    machine: RwLock<Machine>,
    local_store: LocalSessionStore,
}

impl GatewayServer {
    /// Resolves config and local credentials, registers this machine's
    /// identity with the relay, and returns a daemon ready to accept
    /// `spawnSession` calls.
    ///
    /// Spec §9 Open Question (b): `(account_id, hostname, home_dir)` is the
    /// machine identity key. The credentials file `config_bridge::resolve`
    /// loads or creates is itself scoped to this machine's state directory,
    /// so a second daemon started against the same identity reuses the
    /// stored `machine_id`, and its registration publish simply overwrites
    /// the first's `updated_at`/metadata on the relay rather than minting a
    /// second `Machine` entity.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if config resolution fails, the
    /// credentials file is unreadable, opening the local session store
    /// fails, or the initial relay registration round-trip fails.
    pub async fn bootstrap(
        workspace_root: Option<&std::path::Path>,
        home_override: Option<&std::path::Path>,
    ) -> GatewayResult<Arc<Self>> {
        let context = config_bridge::resolve(workspace_root, home_override)?;
        let paths = DaemonPaths::from_dir(context.state_dir.clone());

        let hostname = local_hostname();
        let home_dir = std::env::var("HOME").unwrap_or_default();
        let mut machine = Machine::new(context.account_id, hostname.clone(), home_dir);
        machine.id = context.machine_id;

        let sync = open_sync_client(&context, ConnectionKind::MachineScoped { machine_id: machine.id })?;
        sync.wait_connected().await;
        publish_machine(&sync, &machine).await?;
        sync.shutdown();

        info!(machine_id = %machine.id, %hostname, "machine identity registered with relay");

        let sessions_db = context.state_dir.join("sessions.db");
        let local_store = LocalSessionStore::new(Arc::new(
            happy_storage::SurrealKvStore::open(&sessions_db).map_err(GatewayError::Storage)?,
        ));

        Ok(Arc::new(Self {
            context,
            sessions: Arc::new(SessionManager::new()),
            paths,
            started_at: Instant::now(),
            machine: RwLock::new(machine),
            local_store,
        }))
    }

    /// Filesystem paths this daemon reports its liveness through.
    #[must_use]
    pub fn paths(&self) -> &DaemonPaths {
        &self.paths
    }

    /// Spawns a new session (spec §4.3, session-start sequence steps 2-7):
    /// creates the `Session` entity, opens a session-scoped Sync Client,
    /// binds the tool-extension and hook servers, and spawns the assistant
    /// child pointed at them.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidWorkingDir`] if `working_dir` isn't a
    /// directory, [`GatewayError::InvalidFlavor`] if `flavor` names an
    /// unsupported assistant, or a wrapped sync/runtime/storage/io error if
    /// any step of the start sequence fails.
    pub async fn spawn_session(
        self: &Arc<Self>,
        working_dir: PathBuf,
        flavor: &str,
        extra_args: Vec<String>,
    ) -> GatewayResult<SessionInfo> {
        if !working_dir.is_dir() {
            return Err(GatewayError::InvalidWorkingDir(working_dir.display().to_string()));
        }
        let flavor: AssistantFlavor = parse_flavor(flavor).map_err(GatewayError::InvalidFlavor)?;

        let machine_id = self.machine.read().await.id;
        let agent_id = happy_runtime::session::agent_id_for_flavor(flavor);
        let session_config = happy_runtime::config::SessionConfig::from_config(&self.context.config.config, flavor, None);

        let mut session = Session::new(self.context.account_id, machine_id, agent_id, working_dir.display().to_string());
        session.set_current_model(session_config.model.clone());
        let session_id = session.id.clone();
        let created_at = session.created_at.to_datetime().unwrap_or_else(chrono::Utc::now);

        let sync = open_sync_client(&self.context, ConnectionKind::SessionScoped { session_id: session_id.clone() })?;
        sync.wait_connected().await;

        let encoded = serde_json::to_vec(&session)
            .map_err(|e| GatewayError::StateFile(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        sync.mutate(EntityRef::Session { id: session_id.clone() }, move |_current| encoded.clone())
            .await
            .map_err(GatewayError::Sync)?;

        {
            let mut machine = self.machine.write().await;
            machine.add_active_session(session_id.clone());
            if let Ok(machine_sync) = open_sync_client(&self.context, ConnectionKind::MachineScoped { machine_id }) {
                machine_sync.wait_connected().await;
                if let Err(e) = publish_machine(&machine_sync, &machine).await {
                    warn!(error = %e, "failed to publish active-session index update");
                }
                machine_sync.shutdown();
            }
        }

        let permission_gate = Arc::new(PermissionGate::new(
            session_id.clone(),
            session_config.permission_mode,
            session_config.permission_timeout,
        ));

        let hook_token = Uuid::new_v4().to_string();
        let (tool_addr, tool_task) = spawn_tool_server(working_dir.clone(), Arc::clone(&permission_gate)).await?;
        let (hook_addr, hook_task) = spawn_hook_server(hook_token.clone(), session_id.clone()).await?;

        let spawn_config = SpawnConfig {
            flavor,
            working_dir: working_dir.clone(),
            extra_args,
            model: None,
            permission_mode: session_config.permission_mode,
            sandbox: session_config.sandbox.clone(),
            tool_extension_url: format!("http://{tool_addr}/mcp"),
            hook_server_url: format!("http://{hook_addr}/hooks"),
            hook_token,
        };

        let runtime = SessionRuntime::start(
            session,
            sync,
            spawn_config,
            session_config,
            self.local_store.clone(),
            permission_gate,
        )
        .await
        .map_err(GatewayError::Runtime)?;
        let runtime = Arc::new(runtime);

        let remote_input_runtime = Arc::clone(&runtime);
        let remote_input_session_id = session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = remote_input_runtime.run_remote_input_loop().await {
                warn!(session_id = %remote_input_session_id, error = %e, "remote input loop ended with an error");
            }
        });

        let event_loop_runtime = Arc::clone(&runtime);
        let event_loop_session_id = session_id.clone();
        let event_loop: JoinHandle<()> = tokio::spawn(async move {
            if let Err(e) = event_loop_runtime.run_event_loop().await {
                warn!(session_id = %event_loop_session_id, error = %e, "session event loop ended with an error");
            }
            tool_task.abort();
            hook_task.abort();
        });

        self.sessions
            .insert(
                session_id.clone(),
                SessionHandle { runtime, flavor, workspace: working_dir.clone(), created_at, event_loop },
            )
            .await;

        Ok(SessionInfo { id: session_id, flavor: flavor.binary_name().to_string(), workspace: working_dir, created_at })
    }

    /// Lists every tracked session.
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.list().await.into_iter().map(SessionInfo::from).collect()
    }

    /// Gracefully stops one session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] if no such session is
    /// tracked.
    pub async fn stop_session(&self, id: &happy_core::types::SessionId) -> GatewayResult<()> {
        self.sessions.stop(id).await?;

        let machine_id = {
            let mut machine = self.machine.write().await;
            machine.remove_active_session(id);
            machine.id
        };
        if let Ok(sync) = open_sync_client(&self.context, ConnectionKind::MachineScoped { machine_id }) {
            sync.wait_connected().await;
            let machine = self.machine.read().await;
            if let Err(e) = publish_machine(&sync, &machine).await {
                warn!(error = %e, "failed to publish active-session index update");
            }
            sync.shutdown();
        }
        Ok(())
    }

    /// Reports daemon-wide health (spec §4.3 `daemonStatus`).
    pub async fn status(&self) -> DaemonStatus {
        DaemonStatus {
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            session_count: self.sessions.count().await,
            hostname: self.machine.read().await.hostname.clone(),
        }
    }

    /// Stops every tracked session and removes the PID/port/mode files.
    /// Used by `daemonShutdown` and by the foreground process on
    /// SIGTERM/SIGINT.
    pub async fn shutdown(&self) {
        self.sessions.stop_all().await;

        let machine_id = {
            let mut machine = self.machine.write().await;
            machine.set_status(MachineStatus::Shutdown);
            machine.id
        };
        if let Ok(sync) = open_sync_client(&self.context, ConnectionKind::MachineScoped { machine_id }) {
            sync.wait_connected().await;
            let machine = self.machine.read().await;
            if let Err(e) = publish_machine(&sync, &machine).await {
                warn!(error = %e, "failed to publish shutdown machine status");
            }
            drop(machine);
            sync.shutdown();
        }

        let _ = std::fs::remove_file(self.paths.pid_file());
        let _ = std::fs::remove_file(self.paths.port_file());
        let _ = std::fs::remove_file(self.paths.mode_file());
    }

    /// Runs a periodic heartbeat updating this machine's `updated_at` on
    /// the relay, until `cancellation` fires.
    pub async fn run_heartbeat_loop(self: Arc<Self>, cancellation: tokio_util::sync::CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                _ = interval.tick() => {},
            }
            let machine_id = self.machine.read().await.id;
            let Ok(sync) = open_sync_client(&self.context, ConnectionKind::MachineScoped { machine_id }) else {
                warn!("heartbeat could not open a sync client");
                continue;
            };
            sync.wait_connected().await;
            let mut machine = self.machine.write().await;
            if machine.status == MachineStatus::Online {
                machine.touch();
            } else {
                machine.set_status(MachineStatus::Online);
            }
            if let Err(e) = publish_machine(&sync, &machine).await {
                warn!(error = %e, "heartbeat failed to publish machine update");
            }
            drop(machine);
            sync.shutdown();
        }
    }

    /// Watches the config files this daemon actually loaded and logs a
    /// warning when one changes on disk, until `cancellation` fires.
    /// `GatewayContext` is immutable after bootstrap (see module docs), so
    /// a change doesn't take effect live — this exists to make a stale
    /// running daemon visible to the operator instead of silent.
    ///
    /// No-op if `gateway.hot_reload` is disabled or the watch can't be
    /// established (logged, not fatal — a daemon shouldn't fail to start
    /// over a hot-reload convenience feature).
    pub async fn run_config_watch_loop(self: Arc<Self>, cancellation: tokio_util::sync::CancellationToken) {
        if !self.context.config.config.gateway.hot_reload {
            return;
        }
        let paths: Vec<PathBuf> = self.context.config.loaded_files.iter().map(PathBuf::from).collect();
        if paths.is_empty() {
            return;
        }
        let (_watcher, mut changes) = match happy_config::watch::watch(&paths) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "could not start config hot-reload watcher");
                return;
            },
        };
        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                changed = changes.recv() => {
                    let Some(changed) = changed else { return };
                    warn!(path = %changed.display(), "config file changed on disk; restart the daemon to apply it");
                },
            }
        }
    }
}

fn local_hostname() -> String {
    nix::unistd::gethostname().ok().and_then(|s| s.into_string().ok()).unwrap_or_else(|| "unknown-host".to_string())
}

fn open_sync_client(context: &GatewayContext, connection_kind: ConnectionKind) -> GatewayResult<SyncClient> {
    let cursor_name = match &connection_kind {
        ConnectionKind::UserScoped => "account".to_string(),
        ConnectionKind::MachineScoped { machine_id } => format!("machine-{machine_id}"),
        ConnectionKind::SessionScoped { session_id } => format!("session-{session_id}"),
    };
    let cursor_path = Some(context.state_dir.join("cursors").join(format!("{cursor_name}.json")));
    Ok(SyncClient::connect(SyncClientConfig {
        url: context.config.config.gateway.server_url.clone(),
        token: context.account_id.to_string(),
        connection_kind,
        envelope_key: context.envelope_key.clone(),
        cursor_path,
    }))
}

async fn publish_machine(sync: &SyncClient, machine: &Machine) -> GatewayResult<()> {
    let encoded = serde_json::to_vec(machine)
        .map_err(|e| GatewayError::StateFile(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    sync.mutate(EntityRef::Machine { id: machine.id }, move |_current| encoded.clone()).await.map_err(GatewayError::Sync)?;
    Ok(())
}

async fn spawn_tool_server(
    workspace_root: PathBuf,
    permission_gate: Arc<PermissionGate>,
) -> GatewayResult<(SocketAddr, JoinHandle<()>)> {
    use rmcp::transport::streamable_http_server::StreamableHttpService;
    use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;

    let tool_server =
        ToolServer::new(ToolServerConfig { workspace_root, permission_gate, bash_timeout: Duration::from_secs(120) });
    let service =
        StreamableHttpService::new(move || Ok(tool_server.clone()), LocalSessionManager::default().into(), Default::default());
    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = TcpListener::bind("127.0.0.1:0").await.map_err(GatewayError::Io)?;
    let addr = listener.local_addr().map_err(GatewayError::Io)?;
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, task))
}

async fn spawn_hook_server(
    token: String,
    session_id: happy_core::types::SessionId,
) -> GatewayResult<(SocketAddr, JoinHandle<()>)> {
    let (state, mut events_rx) = HookServerState::new(token);
    let router = happy_runtime::hook_server::app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.map_err(GatewayError::Io)?;
    let addr = listener.local_addr().map_err(GatewayError::Io)?;
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let HookEvent::SessionRotated { new_session_id } = &event {
                debug!(%session_id, %new_session_id, "assistant rotated its on-disk session id");
            }
        }
    });

    Ok((addr, task))
}

/// The loopback jsonrpsee RPC implementation, delegating to [`GatewayServer`].
pub struct RpcImpl {
    server: Arc<GatewayServer>,
}

impl RpcImpl {
    /// Wraps a bootstrapped [`GatewayServer`] for RPC dispatch.
    #[must_use]
    pub fn new(server: Arc<GatewayServer>) -> Self {
        Self { server }
    }
}

#[jsonrpsee::core::async_trait]
impl HappyRpcServer for RpcImpl {
    async fn spawn_session(&self, working_dir: PathBuf, flavor: String, args: Vec<String>) -> Result<SessionInfo, ErrorObjectOwned> {
        self.server.spawn_session(working_dir, &flavor, args).await.map_err(|e| (&e).into())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ErrorObjectOwned> {
        Ok(self.server.list_sessions().await)
    }

    async fn stop_session(&self, session_id: happy_core::types::SessionId) -> Result<(), ErrorObjectOwned> {
        self.server.stop_session(&session_id).await.map_err(|e| (&e).into())
    }

    async fn daemon_status(&self) -> Result<DaemonStatus, ErrorObjectOwned> {
        Ok(self.server.status().await)
    }

    async fn daemon_shutdown(&self) -> Result<(), ErrorObjectOwned> {
        self.server.shutdown().await;
        Ok(())
    }
}

/// Binds the loopback jsonrpsee server and writes the PID/port state files.
///
/// # Errors
///
/// Returns a [`GatewayError::RpcServer`] if binding fails, or an I/O error
/// if the state files can't be written.
pub async fn serve(server: Arc<GatewayServer>) -> GatewayResult<(ServerHandle, SocketAddr)> {
    let jsonrpsee_server = Server::builder().build("127.0.0.1:0").await.map_err(|e| GatewayError::RpcServer(e.to_string()))?;
    let addr = jsonrpsee_server.local_addr().map_err(|e| GatewayError::RpcServer(e.to_string()))?;

    let paths = server.paths().clone();
    let handle = jsonrpsee_server.start(RpcImpl::new(Arc::clone(&server)).into_rpc());

    std::fs::create_dir_all(&paths.base_dir).map_err(GatewayError::Io)?;
    std::fs::write(paths.pid_file(), std::process::id().to_string()).map_err(GatewayError::Io)?;
    std::fs::write(paths.port_file(), addr.port().to_string()).map_err(GatewayError::Io)?;

    Ok((handle, addr))
}
