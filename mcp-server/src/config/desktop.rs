//! Desktop-app config file (`claude_desktop_config.json`)
//!
//! Shape: `{"mcpServers": {"<name>": {"env": {"NETWRIX_API_URL": "...", ...}}}}`.
//! Property names (`mcpServers`, `env`) and env keys match
//! case-insensitively, preferring an exact match; server names match exactly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Recognized server entry names, highest priority first.
pub const SERVER_NAMES: [&str; 3] = ["netwrix-auditor-local", "netwrixAuditor", "netwrix-auditor"];

pub const ENV_API_URL: &str = "NETWRIX_API_URL";
pub const ENV_API_USERNAME: &str = "NETWRIX_API_USERNAME";
pub const ENV_API_PASSWORD: &str = "NETWRIX_API_PASSWORD";
pub const ENV_API_PASSWORD_PROTECTED: &str = "NETWRIX_API_PASSWORD_PROTECTED";
pub const ENV_INTERNAL_API: &str = "NETWRIX_INTERNAL_API";

#[derive(Debug, Error)]
pub enum DesktopConfigError {
    #[error("error reading file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected shape: {0}")]
    Shape(String),
}

/// One server entry; only its environment block is of interest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct McpServerEntry {
    /// `None` values are keys present with a JSON `null`.
    pub env: Option<HashMap<String, Option<String>>>,
}

impl McpServerEntry {
    /// Value for `key`, matched case-insensitively; `Some("")` for a key
    /// present as null or empty.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        let env = self.env.as_ref()?;
        env.get(key)
            .or_else(|| {
                env.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
            .map(|v| v.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesktopConfig {
    pub mcp_servers: Option<HashMap<String, McpServerEntry>>,
}

impl DesktopConfig {
    /// Platform location used by the desktop app.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("Claude").join("claude_desktop_config.json"))
    }

    /// Load from `path`; a missing file yields `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, DesktopConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path).map_err(|source| DesktopConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map(Some)
    }

    pub fn from_json(text: &str) -> Result<Self, DesktopConfigError> {
        let root: Value = serde_json::from_str(text)?;
        let root = match root {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(DesktopConfigError::Shape(format!(
                    "expected an object at the root, found {}",
                    json_kind(&other)
                )))
            }
        };

        let mcp_servers = match get_ignore_case(&root, "mcpServers") {
            None | Some(Value::Null) => None,
            Some(Value::Object(servers)) => {
                let mut parsed = HashMap::with_capacity(servers.len());
                for (name, entry) in servers {
                    parsed.insert(name.clone(), parse_entry(name, entry)?);
                }
                Some(parsed)
            }
            Some(other) => {
                return Err(DesktopConfigError::Shape(format!(
                    "'mcpServers' must be an object, found {}",
                    json_kind(other)
                )))
            }
        };

        Ok(Self { mcp_servers })
    }

    /// First recognized server entry in priority order. Later matches are ignored.
    pub fn find_server(&self) -> Option<(&'static str, &McpServerEntry)> {
        let servers = self.mcp_servers.as_ref()?;
        SERVER_NAMES
            .iter()
            .find_map(|name| servers.get(*name).map(|entry| (*name, entry)))
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.mcp_servers
            .as_ref()
            .map(|servers| servers.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

fn parse_entry(name: &str, entry: &Value) -> Result<McpServerEntry, DesktopConfigError> {
    let entry = match entry {
        Value::Null => return Ok(McpServerEntry::default()),
        Value::Object(map) => map,
        other => {
            return Err(DesktopConfigError::Shape(format!(
                "server '{name}' must be an object, found {}",
                json_kind(other)
            )))
        }
    };
    let env = match get_ignore_case(entry, "env") {
        None | Some(Value::Null) => None,
        Some(env) => Some(serde_json::from_value::<HashMap<String, Option<String>>>(
            env.clone(),
        )?),
    };
    Ok(McpServerEntry { env })
}

fn get_ignore_case<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
