//! `cloudarch-mcp init`: register the server with the MCP clients installed
//! on this machine, scoped to the current project.

use std::{fs, io, path::Path, path::PathBuf};

use log::info;
use thiserror::Error;

/// Key under which the server is registered in client configs.
pub const SERVER_KEY: &str = "cloudarch";

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Neither `claude` nor `codex` found in PATH. Install Claude Code or OpenAI Codex first, then re-run `cloudarch-mcp init`.")]
    NoClient,

    #[error("Cannot update {path}: {message}. Fix or remove it, then re-run `cloudarch-mcp init`.")]
    Parse { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Clients detected on `PATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clients {
    pub claude: bool,
    pub codex: bool,
}

impl Clients {
    pub fn detect() -> Self {
        Self {
            claude: which::which("claude").is_ok(),
            codex: which::which("codex").is_ok(),
        }
    }

    fn names(self) -> Vec<&'static str> {
        [
            self.claude.then_some("Claude Code"),
            self.codex.then_some("Codex"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Write project-scoped client configs in the current directory pointing at
/// the running binary.
pub fn init_project() -> Result<(), InitError> {
    let binary = std::env::current_exe()?.canonicalize()?;
    let cwd = std::env::current_dir()?;
    let written = write_client_configs(&cwd, &binary.to_string_lossy(), Clients::detect())?;
    for path in &written {
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

/// Write whichever client configs `clients` calls for under `dir`.
///
/// Both files are read and updated in memory first, so an unreadable one
/// leaves everything on disk untouched.
pub fn write_client_configs(
    dir: &Path,
    binary_path: &str,
    clients: Clients,
) -> Result<Vec<PathBuf>, InitError> {
    if !clients.claude && !clients.codex {
        return Err(InitError::NoClient);
    }

    let mut updates = Vec::new();
    if clients.claude {
        updates.push(claude_code_config(dir, binary_path)?);
    }
    if clients.codex {
        updates.push(codex_config(dir, binary_path)?);
    }

    let mut written = Vec::with_capacity(updates.len());
    for (path, contents) in updates {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        written.push(path);
    }

    info!(clients = clients.names().join(" and "); "Registered cloudarch for this project");
    Ok(written)
}

/// `.mcp.json` with a stdio entry for this server merged in.
fn claude_code_config(dir: &Path, binary_path: &str) -> Result<(PathBuf, String), InitError> {
    let path = dir.join(".mcp.json");
    let mut root = if path.exists() {
        let parse_error = |message: String| InitError::Parse {
            path: path.clone(),
            message,
        };
        let root: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)
            .map_err(|e| parse_error(e.to_string()))?;
        if !root.is_object() {
            return Err(parse_error("expected a JSON object".to_string()));
        }
        if root.get("mcpServers").is_some_and(|v| !v.is_object()) {
            return Err(parse_error("`mcpServers` is not an object".to_string()));
        }
        root
    } else {
        serde_json::json!({})
    };

    if root.get("mcpServers").is_none() {
        root["mcpServers"] = serde_json::json!({});
    }
    root["mcpServers"][SERVER_KEY] = serde_json::json!({
        "type": "stdio",
        "command": binary_path,
        "args": [],
    });

    let contents = serde_json::to_string_pretty(&root)?;
    Ok((path, contents))
}

/// `.codex/config.toml` with an `mcp_servers.cloudarch` entry merged in,
/// keeping the rest of the document (comments included) intact. An inline
/// `mcp_servers = { ... }` table stays inline.
fn codex_config(dir: &Path, binary_path: &str) -> Result<(PathBuf, String), InitError> {
    let path = dir.join(".codex").join("config.toml");

    let mut doc: toml_edit::DocumentMut = if path.exists() {
        fs::read_to_string(&path)?
            .parse()
            .map_err(|e: toml_edit::TomlError| InitError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?
    } else {
        toml_edit::DocumentMut::new()
    };

    let mut server = toml_edit::Table::new();
    server.insert("command", toml_edit::value(binary_path));
    server.insert("args", toml_edit::value(toml_edit::Array::new()));

    match doc.get_mut("mcp_servers") {
        None => {
            let mut servers = toml_edit::Table::new();
            servers.set_implicit(true);
            servers.insert(SERVER_KEY, toml_edit::Item::Table(server));
            doc.insert("mcp_servers", toml_edit::Item::Table(servers));
        }
        Some(toml_edit::Item::Table(servers)) => {
            servers.insert(SERVER_KEY, toml_edit::Item::Table(server));
        }
        Some(toml_edit::Item::Value(toml_edit::Value::InlineTable(servers))) => {
            servers.insert(
                SERVER_KEY,
                toml_edit::Value::InlineTable(server.into_inline_table()),
            );
        }
        Some(_) => {
            return Err(InitError::Parse {
                path,
                message: "`mcp_servers` is not a table".to_string(),
            });
        }
    }

    Ok((path, doc.to_string()))
}
