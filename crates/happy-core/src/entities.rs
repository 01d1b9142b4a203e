//! The data model shared by the Relay Core, the Sync Client, and the Session
//! Runtime: accounts, machines, sessions, messages, the durable update log,
//! and the approval/elicitation types that flow between a session and its
//! controlling user.
//!
//! Every durable entity carries `created_at`/`updated_at`/`version` for
//! per-entity optimistic concurrency; `Update` additionally carries the
//! account-wide monotonic `seq` used for ordering delivery (see the
//! publish/subscribe algorithm).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::EntityRef;
use crate::types::{AccountId, AgentId, MachineId, RiskLevel, SessionId, Timestamp};

/// An account: the encryption and ownership boundary. All machines,
/// sessions, and messages belong to exactly one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Optional human-readable display name.
    pub display_name: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
    /// Optimistic-concurrency version, incremented on every mutation.
    pub version: u64,
}

impl Account {
    /// Creates a new account with a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            id: AccountId::new(),
            display_name: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Applies an update, bumping `version` and `updated_at`.
    pub fn touch(&mut self) {
        self.version = self.version.saturating_add(1);
        self.updated_at = Timestamp::now();
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

/// A machine's daemon-state lifecycle (spec §3: "daemon state
/// `online|offline|shutdown`"). Transitions: created on first daemon boot ->
/// `online`; a heartbeat gap beyond the liveness window -> `offline`; a
/// graceful `daemonShutdown` -> `shutdown`. `offline` can still transition
/// back to `online` on reconnect; `shutdown` is terminal for that daemon
/// process (a subsequent boot republishes `online` against the same
/// `Machine` id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    /// The daemon is running and has heartbeated recently.
    Online,
    /// The daemon has missed its heartbeat window.
    Offline,
    /// The daemon shut down cleanly.
    Shutdown,
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// A machine the daemon runs on. Identity is `(hostname, home_dir)`: a
/// second daemon registering the same pair overwrites the prior registration
/// rather than creating a duplicate (see the Open Questions in the design
/// notes for the rationale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Unique machine identifier.
    pub id: MachineId,
    /// Owning account.
    pub account_id: AccountId,
    /// Hostname, part of the identity key.
    pub hostname: String,
    /// Home directory, part of the identity key.
    pub home_dir: String,
    /// Optional user-assigned label (e.g. "laptop", "build-box").
    pub label: Option<String>,
    /// Current daemon-state lifecycle.
    pub status: MachineStatus,
    /// Sessions this machine's daemon currently has running, the
    /// "active-session index" spec §3 requires alongside daemon state.
    pub active_sessions: Vec<SessionId>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time (e.g. last daemon heartbeat).
    pub updated_at: Timestamp,
    /// Optimistic-concurrency version.
    pub version: u64,
}

impl Machine {
    /// Creates a new machine registration for the given identity key,
    /// `online` from the moment the daemon first boots.
    #[must_use]
    pub fn new(account_id: AccountId, hostname: impl Into<String>, home_dir: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: MachineId::new(),
            account_id,
            hostname: hostname.into(),
            home_dir: home_dir.into(),
            label: None,
            status: MachineStatus::Online,
            active_sessions: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Sets a user-assigned label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the identity key this machine registers under.
    #[must_use]
    pub fn identity_key(&self) -> (&str, &str) {
        (&self.hostname, &self.home_dir)
    }

    /// Transitions the daemon-state lifecycle, bumping version/timestamp.
    pub fn set_status(&mut self, status: MachineStatus) {
        self.status = status;
        self.touch();
    }

    /// Adds a session to the active-session index if not already present.
    pub fn add_active_session(&mut self, session_id: SessionId) {
        if !self.active_sessions.contains(&session_id) {
            self.active_sessions.push(session_id);
            self.touch();
        }
    }

    /// Removes a session from the active-session index.
    pub fn remove_active_session(&mut self, session_id: &SessionId) {
        let before = self.active_sessions.len();
        self.active_sessions.retain(|id| id != session_id);
        if self.active_sessions.len() != before {
            self.touch();
        }
    }

    /// Applies an update, bumping `version` and `updated_at`.
    pub fn touch(&mut self) {
        self.version = self.version.saturating_add(1);
        self.updated_at = Timestamp::now();
    }
}

/// Lifecycle state of a session (spec §3: "lifecycle `running|archived`").
/// A session that exits cleanly and a session whose daemon is killed by a
/// signal both converge on `Archived`; there is no separate disconnected
/// state to observe from the relay's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The session's child process is running and reachable.
    Running,
    /// The session has ended: the child exited, the user closed it, or the
    /// daemon archived it on signal (SIGTERM/SIGINT).
    Archived,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// Live, frequently-changing session state that isn't part of its identity
/// (contrast with [`Session`]'s mostly-static fields). Published as its own
/// persistent update whenever it changes. Spec §3: "presence bits:
/// `thinking`, `controlledByUser`, `currentModel`".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    /// `true` when the terminal-attached CLI has keyboard control; `false`
    /// when control lives with a remote (phone-driven) client.
    pub controlled_by_user: bool,
    /// `true` while the assistant is actively generating (between an
    /// accepted input and the next `ready` event).
    pub thinking: bool,
    /// The model currently in effect, if the flavor reports one (spec §6:
    /// resolved from `SpawnConfig::model` or the flavor's env-var default).
    pub current_model: Option<String>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self { controlled_by_user: true, thinking: false, current_model: None }
    }
}

/// A coding-assistant session: one spawned child process, tracked end to
/// end from the CLI's `SessionId` through to the relay and any connected
/// clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Client-chosen session identifier.
    pub id: SessionId,
    /// Owning account.
    pub account_id: AccountId,
    /// Machine this session is running on.
    pub machine_id: MachineId,
    /// Which coding assistant this session runs.
    pub agent_id: AgentId,
    /// Absolute path to the workspace the assistant was launched in.
    pub workspace_path: String,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Local/remote control-mode and other live state.
    pub agent_state: AgentState,
    /// Free-form session metadata (e.g. terminal title, git branch).
    pub metadata: HashMap<String, String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
    /// Optimistic-concurrency version.
    pub version: u64,
}

impl Session {
    /// Creates a new active session.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        machine_id: MachineId,
        agent_id: AgentId,
        workspace_path: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionId::generate(),
            account_id,
            machine_id,
            agent_id,
            workspace_path: workspace_path.into(),
            status: SessionStatus::Running,
            agent_state: AgentState::default(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Flips the control-mode bit, bumping version/timestamp (spec §4.3,
    /// "Control-mode switch").
    pub fn set_controlled_by_user(&mut self, controlled_by_user: bool) {
        self.agent_state.controlled_by_user = controlled_by_user;
        self.touch();
    }

    /// Sets the `thinking` presence bit, bumping version/timestamp.
    pub fn set_thinking(&mut self, thinking: bool) {
        self.agent_state.thinking = thinking;
        self.touch();
    }

    /// Sets the `currentModel` presence field, bumping version/timestamp.
    pub fn set_current_model(&mut self, model: Option<String>) {
        self.agent_state.current_model = model;
        self.touch();
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Transitions the session to a new status, bumping version/timestamp.
    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.touch();
    }

    /// Returns `true` if the session can still accept input.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.status, SessionStatus::Running)
    }

    /// Applies an update, bumping `version` and `updated_at`.
    pub fn touch(&mut self) {
        self.version = self.version.saturating_add(1);
        self.updated_at = Timestamp::now();
    }
}

/// Who or what authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Authored by the controlling user.
    User,
    /// Authored by the coding assistant.
    Assistant,
    /// A tool invocation record (call or result).
    Tool,
    /// System-level annotation (mode switch, compaction marker).
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Closed set of agent-event kinds a message of `kind: agent-event` can
/// carry (spec §3/§4.3: mode switches, limit notices, and the final
/// `ready-with-usage` event bearing cumulative token counts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// The assistant switched operating mode (e.g. plan -> build).
    SwitchMode {
        /// The mode switched to.
        mode: String,
    },
    /// A rate or usage limit was reached.
    LimitReached,
    /// The assistant reported cumulative usage and went idle.
    ReadyWithUsage {
        /// Input tokens consumed this session.
        input_tokens: u64,
        /// Output tokens produced this session.
        output_tokens: u64,
    },
    /// The session ended; the child process is gone.
    SessionDeath,
    /// Any other event kind not in the closed set above, carried by name.
    Other {
        /// The raw event kind string.
        kind: String,
    },
}

/// A tool invocation and, once it lands, its result (spec §9, "tool-call
/// children"). `output`/`is_error` start unset and are filled in by a
/// follow-up merge into the same entity when the matching `ToolResult`
/// arrives, rather than by creating a second message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallBody {
    /// The tool call id the assistant flavor assigned, used to correlate
    /// the eventual result.
    pub tool_id: String,
    /// Tool name.
    pub name: String,
    /// Arguments passed to the tool.
    pub arguments: serde_json::Value,
    /// The tool's output, once the result has landed.
    pub output: Option<String>,
    /// Whether the tool call failed.
    pub is_error: bool,
    /// Ordered flat-id refs to any child messages this tool call produced
    /// (spec §9: "model tool-call children as an ordered list of message
    /// refs owned by the parent; all refs are flat ids, not pointers").
    pub children: Vec<Uuid>,
}

impl ToolCallBody {
    /// Creates a tool-call body for a call that hasn't resolved yet.
    #[must_use]
    pub fn new(tool_id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self { tool_id: tool_id.into(), name: name.into(), arguments, output: None, is_error: false, children: Vec::new() }
    }
}

/// The polymorphic body of a [`Message`]. `kind` is a closed set (spec §3:
/// "`kind` in `{user-text, agent-text, tool-call, agent-event}`"); no
/// extension beyond these four.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MessageBody {
    /// Text authored by the controlling user.
    UserText {
        /// The text itself. Never logged; see the ambient logging policy.
        text: String,
    },
    /// Text authored by the coding assistant.
    AgentText {
        /// The text itself. Never logged; see the ambient logging policy.
        text: String,
    },
    /// A tool invocation record (call, and later its result).
    ToolCall(ToolCallBody),
    /// A system-level annotation (mode switch, session death, ...).
    AgentEvent(AgentEvent),
}

/// One message in a session's transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// Session this message belongs to.
    pub session_id: SessionId,
    /// Client-assigned dedup key: two messages sharing a `local_id` MUST
    /// coalesce to whichever landed first (spec §3/§9).
    pub local_id: Option<String>,
    /// The message's polymorphic content.
    pub body: MessageBody,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time (messages are append-only but may be
    /// retracted/edited by a `/clear` or compaction boundary, or updated in
    /// place when a tool call's result arrives).
    pub updated_at: Timestamp,
    /// Optimistic-concurrency version.
    pub version: u64,
}

impl Message {
    /// Creates a new message with the given body.
    #[must_use]
    pub fn new(session_id: SessionId, body: MessageBody) -> Self {
        let now = Timestamp::now();
        Self {
            id: Uuid::new_v4(),
            session_id,
            local_id: None,
            body,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Attaches a client-assigned dedup key.
    #[must_use]
    pub fn with_local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }

    /// The coarse [`MessageRole`] this message's body corresponds to, for
    /// call sites that only need author-class filtering (e.g. the
    /// terminal's own-echo suppression) rather than the full tagged body.
    #[must_use]
    pub fn role(&self) -> MessageRole {
        match &self.body {
            MessageBody::UserText { .. } => MessageRole::User,
            MessageBody::AgentText { .. } => MessageRole::Assistant,
            MessageBody::ToolCall(_) => MessageRole::Tool,
            MessageBody::AgentEvent(_) => MessageRole::System,
        }
    }

    /// Applies an update, bumping `version` and `updated_at`.
    pub fn touch(&mut self) {
        self.version = self.version.saturating_add(1);
        self.updated_at = Timestamp::now();
    }
}

/// What kind of change an [`Update`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// The entity was created.
    Created,
    /// The entity was modified.
    Updated,
    /// The entity was deleted.
    Deleted,
}

/// A single entry in an account's durable update log. `seq` is assigned by
/// the Relay Core at publish time and is strictly monotonic per account; it
/// is the ordering primitive every subscriber replays against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    /// Monotonically increasing sequence number, unique per account.
    pub seq: u64,
    /// Owning account.
    pub account_id: AccountId,
    /// What changed.
    pub entity: EntityRef,
    /// What kind of change this is.
    pub kind: UpdateKind,
    /// The new version of the affected entity after this change.
    pub entity_version: u64,
    /// When the Relay Core assigned this `seq`.
    pub created_at: Timestamp,
}

impl Update {
    /// Creates a new update record. `seq` is filled in by the Relay Core's
    /// publish path, not by the caller, so this constructor takes it
    /// explicitly rather than generating one.
    #[must_use]
    pub fn new(seq: u64, account_id: AccountId, entity: EntityRef, kind: UpdateKind, entity_version: u64) -> Self {
        Self {
            seq,
            account_id,
            entity,
            kind,
            entity_version,
            created_at: Timestamp::now(),
        }
    }
}

/// A non-durable, best-effort event (typing indicators, cursor position,
/// presence). Never written to the update log and never replayed on resync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralEvent {
    /// Session this event is about.
    pub session_id: SessionId,
    /// The kind of ephemeral event.
    pub kind: String,
    /// Event payload, shape depends on `kind`.
    pub payload: serde_json::Value,
    /// When the event was emitted.
    pub created_at: Timestamp,
}

impl EphemeralEvent {
    /// Creates a new ephemeral event.
    #[must_use]
    pub fn new(session_id: SessionId, kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            session_id,
            kind: kind.into(),
            payload,
            created_at: Timestamp::now(),
        }
    }
}

// --- Approval flow -----------------------------------------------------

/// Request for user approval of a tool call or other gated operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request ID.
    pub request_id: Uuid,
    /// Session the request originated from.
    pub session_id: SessionId,
    /// Operation being requested (e.g. the tool name).
    pub operation: String,
    /// Human-readable description shown to the user.
    pub description: String,
    /// Risk classification driving the default option set.
    pub risk_level: RiskLevel,
    /// Resource being accessed, if applicable (a path, a URL, a command).
    pub resource: Option<String>,
    /// Options offered to the user.
    pub options: Vec<ApprovalOption>,
}

impl ApprovalRequest {
    /// Creates a new approval request with the standard option set.
    #[must_use]
    pub fn new(session_id: SessionId, operation: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            session_id,
            operation: operation.into(),
            description: description.into(),
            risk_level: RiskLevel::Medium,
            resource: None,
            options: vec![
                ApprovalOption::AllowOnce,
                ApprovalOption::AllowSession,
                ApprovalOption::AllowWorkspace,
                ApprovalOption::AllowAlways,
                ApprovalOption::Deny,
            ],
        }
    }

    /// Sets the risk level.
    #[must_use]
    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = level;
        self
    }

    /// Sets the resource.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Restricts the options offered (e.g. a plan-mode auto-approve flow
    /// only ever offers `AllowOnce`/`Deny`).
    #[must_use]
    pub fn with_options(mut self, options: Vec<ApprovalOption>) -> Self {
        self.options = options;
        self
    }
}

/// Options offered for an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOption {
    /// Allow this one time.
    AllowOnce,
    /// Allow for the remainder of the current session.
    AllowSession,
    /// Allow for the current workspace, persisted durably.
    AllowWorkspace,
    /// Allow always; creates a durable capability token.
    AllowAlways,
    /// Deny the operation.
    Deny,
}

impl fmt::Display for ApprovalOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowOnce => write!(f, "Allow Once"),
            Self::AllowSession => write!(f, "Allow Session"),
            Self::AllowWorkspace => write!(f, "Allow Workspace"),
            Self::AllowAlways => write!(f, "Allow Always"),
            Self::Deny => write!(f, "Deny"),
        }
    }
}

/// The user's decision on an [`ApprovalRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// Request this responds to.
    pub request_id: Uuid,
    /// Option selected.
    pub decision: ApprovalOption,
    /// When the decision was made.
    pub decided_at: Timestamp,
    /// Optional reason the user gave.
    pub reason: Option<String>,
}

impl ApprovalDecision {
    /// Creates a new decision.
    #[must_use]
    pub fn new(request_id: Uuid, decision: ApprovalOption) -> Self {
        Self {
            request_id,
            decision,
            decided_at: Timestamp::now(),
            reason: None,
        }
    }

    /// Attaches a reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns `true` unless the decision was `Deny`.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        !matches!(self.decision, ApprovalOption::Deny)
    }

    /// Returns `true` if this decision should mint a durable capability token.
    #[must_use]
    pub fn creates_capability(&self) -> bool {
        matches!(self.decision, ApprovalOption::AllowAlways)
    }

    /// Returns `true` if this decision should create a workspace allowance.
    #[must_use]
    pub fn creates_workspace_allowance(&self) -> bool {
        matches!(self.decision, ApprovalOption::AllowWorkspace)
    }
}

/// A timeout applied to an [`ApprovalRequest`] that received no response;
/// per the failure semantics in the design notes, this always resolves to
/// `Deny` rather than leaving the gated operation pending indefinitely.
#[must_use]
pub fn timeout_decision(request_id: Uuid) -> ApprovalDecision {
    ApprovalDecision::new(request_id, ApprovalOption::Deny).with_reason("timed out awaiting a decision")
}

// --- MCP elicitation -----------------------------------------------------

/// An MCP server asking the controlling user for input mid-tool-call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationRequest {
    /// Unique request ID.
    pub request_id: Uuid,
    /// Name of the MCP server making the request.
    pub server_name: String,
    /// Shape of the expected input.
    pub schema: ElicitationSchema,
    /// Human-readable prompt.
    pub message: String,
    /// Whether a response is required to continue.
    pub required: bool,
}

impl ElicitationRequest {
    /// Creates a new free-text elicitation request.
    #[must_use]
    pub fn new(server_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            server_name: server_name.into(),
            schema: ElicitationSchema::Text { placeholder: None, max_length: None },
            message: message.into(),
            required: true,
        }
    }

    /// Sets the schema.
    #[must_use]
    pub fn with_schema(mut self, schema: ElicitationSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Marks the request as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Shape of input an [`ElicitationRequest`] expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElicitationSchema {
    /// Free-form text.
    Text {
        /// Placeholder text.
        placeholder: Option<String>,
        /// Maximum accepted length.
        max_length: Option<usize>,
    },
    /// Masked secret input.
    Secret {
        /// Placeholder text.
        placeholder: Option<String>,
    },
    /// Selection from a fixed option set.
    Select {
        /// Available options.
        options: Vec<SelectOption>,
        /// Whether multiple options may be selected.
        multiple: bool,
    },
    /// A yes/no confirmation.
    Confirm {
        /// Default value if the user accepts a suggested default.
        default: bool,
    },
}

/// One option in a [`ElicitationSchema::Select`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    /// Value submitted when chosen.
    pub value: String,
    /// Display label.
    pub label: String,
    /// Optional longer description.
    pub description: Option<String>,
}

impl SelectOption {
    /// Creates a new select option.
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self { value: value.into(), label: label.into(), description: None }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Response to an [`ElicitationRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationResponse {
    /// Request this responds to.
    pub request_id: Uuid,
    /// Action taken.
    pub action: ElicitationAction,
}

impl ElicitationResponse {
    /// Creates a submit response.
    #[must_use]
    pub fn submit(request_id: Uuid, value: serde_json::Value) -> Self {
        Self { request_id, action: ElicitationAction::Submit { value } }
    }

    /// Creates a cancel response.
    #[must_use]
    pub fn cancel(request_id: Uuid) -> Self {
        Self { request_id, action: ElicitationAction::Cancel }
    }

    /// Creates a dismiss response (only valid for optional requests).
    #[must_use]
    pub fn dismiss(request_id: Uuid) -> Self {
        Self { request_id, action: ElicitationAction::Dismiss }
    }
}

/// Action taken in response to an elicitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElicitationAction {
    /// The user submitted a value.
    Submit {
        /// The submitted value.
        value: serde_json::Value,
    },
    /// The user cancelled.
    Cancel,
    /// The user dismissed an optional request.
    Dismiss,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_touch_bumps_version_and_timestamp() {
        let mut account = Account::new();
        let original_version = account.version;
        let original_updated = account.updated_at;
        account.touch();
        assert_eq!(account.version, original_version + 1);
        assert!(account.updated_at >= original_updated);
    }

    #[test]
    fn machine_identity_key_is_hostname_and_home_dir() {
        let machine = Machine::new(AccountId::new(), "laptop", "/home/alice");
        assert_eq!(machine.identity_key(), ("laptop", "/home/alice"));
    }

    #[test]
    fn machine_starts_online_and_tracks_active_sessions() {
        let mut machine = Machine::new(AccountId::new(), "laptop", "/home/alice");
        assert_eq!(machine.status, MachineStatus::Online);

        let session_id = SessionId::generate();
        machine.add_active_session(session_id.clone());
        assert_eq!(machine.active_sessions, vec![session_id.clone()]);
        // Adding the same session again is a no-op, not a duplicate entry.
        let version_after_first_add = machine.version;
        machine.add_active_session(session_id.clone());
        assert_eq!(machine.version, version_after_first_add);

        machine.remove_active_session(&session_id);
        assert!(machine.active_sessions.is_empty());

        machine.set_status(MachineStatus::Shutdown);
        assert_eq!(machine.status, MachineStatus::Shutdown);
    }

    #[test]
    fn message_role_reflects_tagged_body() {
        let session_id = SessionId::generate();
        let user = Message::new(session_id.clone(), MessageBody::UserText { text: "hi".to_string() });
        assert_eq!(user.role(), MessageRole::User);

        let tool_call = Message::new(
            session_id.clone(),
            MessageBody::ToolCall(ToolCallBody::new("t1", "bash", serde_json::json!({"command": "ls"}))),
        );
        assert_eq!(tool_call.role(), MessageRole::Tool);

        let event = Message::new(session_id, MessageBody::AgentEvent(AgentEvent::LimitReached));
        assert_eq!(event.role(), MessageRole::System);
    }

    #[test]
    fn tool_call_body_starts_unresolved() {
        let call = ToolCallBody::new("t1", "bash", serde_json::json!({"command": "ls"}));
        assert!(call.output.is_none());
        assert!(!call.is_error);
        assert!(call.children.is_empty());
    }

    #[test]
    fn session_set_status_transitions_and_bumps_version() {
        let mut session = Session::new(
            AccountId::new(),
            MachineId::new(),
            AgentId::new("claude"),
            "/workspace",
        );
        assert!(session.is_active());
        session.set_status(SessionStatus::Archived);
        assert!(!session.is_active());
        assert_eq!(session.version, 2);
    }

    #[test]
    fn approval_decision_classifies_durable_effects() {
        let request_id = Uuid::new_v4();
        let allow_always = ApprovalDecision::new(request_id, ApprovalOption::AllowAlways);
        assert!(allow_always.is_approved());
        assert!(allow_always.creates_capability());
        assert!(!allow_always.creates_workspace_allowance());

        let deny = ApprovalDecision::new(request_id, ApprovalOption::Deny);
        assert!(!deny.is_approved());
    }

    #[test]
    fn timeout_decision_always_denies() {
        let decision = timeout_decision(Uuid::new_v4());
        assert!(!decision.is_approved());
        assert_eq!(decision.reason.as_deref(), Some("timed out awaiting a decision"));
    }

    #[test]
    fn entity_ref_serializes_with_tagged_type() {
        let entity = EntityRef::Session { id: SessionId::generate() };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["entityKind"], "session");
    }

    #[test]
    fn update_carries_the_caller_assigned_seq() {
        let entity = EntityRef::Account { id: AccountId::new() };
        let update = Update::new(42, AccountId::new(), entity, UpdateKind::Updated, 3);
        assert_eq!(update.seq, 42);
        assert_eq!(update.entity_version, 3);
    }
}
