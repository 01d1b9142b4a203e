//! The tool-extension server (spec §4.3 step 4): an MCP server the CLI
//! runs locally, exposing `read_file`/`write_file`/`bash`/`list_files` as
//! MCP-style tool extensions the assistant child calls into over HTTP.
//!
//! Grounded on `rmcp`'s `#[tool_router]`/`#[tool]` macro pattern (the same
//! shape as the pack's Unity MCP bridge server) and served over the
//! `transport-streamable-http-server` feature, since the assistant talks
//! to this over loopback HTTP rather than stdio — the CLI itself is the
//! process with stdio already claimed by the assistant's own subprocess
//! pipe (spec §4.3: "a tool-extension server exposing tools ... that the
//! assistant can call as MCP-style extensions").

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_router};
use serde::{Deserialize, Serialize};

use crate::permission::{PermissionGate, ToolInvocation};

/// Hands the tool server everything it needs to gate and execute calls
/// without owning the rest of the session.
pub struct ToolServerConfig {
    /// Workspace root every path argument is resolved and confined to.
    pub workspace_root: PathBuf,
    /// Gate tool calls route through before executing.
    pub permission_gate: Arc<PermissionGate>,
    /// Timeout applied to `bash` invocations.
    pub bash_timeout: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReadFileOutput {
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WriteFileOutput {
    bytes_written: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct BashOutput {
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ListFilesOutput {
    entries: Vec<String>,
}

/// The MCP server handle. One instance per session; holds no state shared
/// across sessions.
#[derive(Clone)]
pub struct ToolServer {
    tool_router: ToolRouter<Self>,
    workspace_root: PathBuf,
    permission_gate: Arc<PermissionGate>,
    bash_timeout: Duration,
}

#[tool_router]
impl ToolServer {
    /// Builds a new tool server for one session.
    #[must_use]
    pub fn new(config: ToolServerConfig) -> Self {
        Self {
            tool_router: Self::tool_router(),
            workspace_root: config.workspace_root,
            permission_gate: config.permission_gate,
            bash_timeout: config.bash_timeout,
        }
    }

    /// Resolves `path` against the workspace root, rejecting anything that
    /// escapes it.
    fn resolve(&self, path: &str) -> Result<PathBuf, McpError> {
        let candidate = self.workspace_root.join(path);
        let resolved = dunce_canonicalize(&candidate).unwrap_or(candidate);
        if !resolved.starts_with(&self.workspace_root) {
            return Err(McpError::invalid_params("path escapes the workspace root", None));
        }
        Ok(resolved)
    }

    async fn gate(&self, tool_name: &str, arguments: serde_json::Value, is_plan_safe: bool) -> Result<(), McpError> {
        let invocation = ToolInvocation { tool_name: tool_name.to_string(), arguments, is_plan_safe };
        self.permission_gate
            .request(invocation, |_request| Ok(()))
            .await
            .map_err(|e| McpError::internal_error(format!("permission denied: {e}"), None))?;
        Ok(())
    }

    #[tool(description = "Read the contents of a file within the workspace")]
    pub async fn read_file(&self, path: String) -> Result<CallToolResult, McpError> {
        self.gate("read_file", serde_json::json!({ "path": path }), true).await?;
        let resolved = self.resolve(&path)?;
        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| McpError::internal_error(format!("read failed: {e}"), None))?;
        let body = serde_json::to_string(&ReadFileOutput { content })
            .map_err(|e| McpError::internal_error(format!("serialization error: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }

    #[tool(description = "Write (overwriting) a file within the workspace")]
    pub async fn write_file(&self, path: String, content: String) -> Result<CallToolResult, McpError> {
        self.gate("write_file", serde_json::json!({ "path": path, "bytes": content.len() }), false).await?;
        let resolved = self.resolve(&path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| McpError::internal_error(format!("mkdir failed: {e}"), None))?;
        }
        tokio::fs::write(&resolved, content.as_bytes())
            .await
            .map_err(|e| McpError::internal_error(format!("write failed: {e}"), None))?;
        let body = serde_json::to_string(&WriteFileOutput { bytes_written: content.len() })
            .map_err(|e| McpError::internal_error(format!("serialization error: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }

    #[tool(description = "Run a shell command in the workspace, bounded by a timeout")]
    pub async fn bash(&self, command: String) -> Result<CallToolResult, McpError> {
        self.gate("bash", serde_json::json!({ "command": command }), false).await?;

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::internal_error(format!("spawn failed: {e}"), None))?;

        let output = tokio::time::timeout(self.bash_timeout, child.wait_with_output())
            .await
            .map_err(|_| McpError::internal_error(format!("bash command timed out after {:?}", self.bash_timeout), None))?
            .map_err(|e| McpError::internal_error(format!("bash command failed: {e}"), None))?;

        let body = serde_json::to_string(&BashOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
        .map_err(|e| McpError::internal_error(format!("serialization error: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }

    #[tool(description = "List files under a directory within the workspace")]
    pub async fn list_files(&self, path: Option<String>, recursive: Option<bool>) -> Result<CallToolResult, McpError> {
        let path = path.unwrap_or_default();
        self.gate("list_files", serde_json::json!({ "path": path, "recursive": recursive }), true).await?;
        let resolved = self.resolve(&path)?;
        let recursive = recursive.unwrap_or(false);

        let mut entries = Vec::new();
        if recursive {
            for entry in walkdir::WalkDir::new(&resolved).into_iter().filter_map(Result::ok) {
                if let Ok(rel) = entry.path().strip_prefix(&self.workspace_root) {
                    entries.push(rel.to_string_lossy().into_owned());
                }
            }
        } else {
            let mut dir = tokio::fs::read_dir(&resolved)
                .await
                .map_err(|e| McpError::internal_error(format!("list failed: {e}"), None))?;
            while let Some(entry) =
                dir.next_entry().await.map_err(|e| McpError::internal_error(format!("list failed: {e}"), None))?
            {
                if let Ok(rel) = entry.path().strip_prefix(&self.workspace_root) {
                    entries.push(rel.to_string_lossy().into_owned());
                }
            }
        }
        entries.sort();

        let body = serde_json::to_string(&ListFilesOutput { entries })
            .map_err(|e| McpError::internal_error(format!("serialization error: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            server_info: Implementation { name: "happy-tool-extension".to_string(), version: env!("CARGO_PKG_VERSION").to_string() },
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::default(),
            instructions: Some(
                "Local tool extensions for the active Happy session: read_file, write_file, bash, list_files."
                    .to_string(),
            ),
        }
    }
}

fn dunce_canonicalize(path: &Path) -> std::io::Result<PathBuf> {
    if path.exists() { std::fs::canonicalize(path) } else { Ok(path.to_path_buf()) }
}

#[cfg(test)]
fn content_text(result: &CallToolResult) -> String {
    result.content[0].as_text().expect("tool result should carry text content").text.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::child::PermissionMode;
    use happy_core::types::SessionId;

    fn test_server(root: PathBuf) -> ToolServer {
        let gate = Arc::new(PermissionGate::new(SessionId::generate(), PermissionMode::BypassPermissions, Duration::from_secs(1)));
        ToolServer::new(ToolServerConfig { workspace_root: root, permission_gate: gate, bash_timeout: Duration::from_secs(5) })
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path().to_path_buf());
        server.write_file("note.txt".to_string(), "hello".to_string()).await.unwrap();
        let result = server.read_file("note.txt".to_string()).await.unwrap();
        let text = content_text(&result);
        let parsed: ReadFileOutput = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.content, "hello");
    }

    #[tokio::test]
    async fn path_escape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path().to_path_buf());
        let result = server.read_file("../../etc/passwd".to_string()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bash_runs_and_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path().to_path_buf());
        let result = server.bash("echo hi".to_string()).await.unwrap();
        let text = content_text(&result);
        let parsed: BashOutput = serde_json::from_str(&text).unwrap();
        assert!(parsed.stdout.contains("hi"));
        assert_eq!(parsed.exit_code, Some(0));
    }

    #[tokio::test]
    async fn list_files_lists_non_recursive_entries() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), b"x").await.unwrap();
        let server = test_server(dir.path().to_path_buf());
        let result = server.list_files(None, None).await.unwrap();
        let text = content_text(&result);
        let parsed: ListFilesOutput = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.entries, vec!["a.txt".to_string()]);
    }
}
