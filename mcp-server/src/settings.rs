//! Base application settings loaded from `settings.toml`
//!
//! Keys are snake_case; the PascalCase names used by earlier deployments
//! (`[Netwrix] ApiUrl = ...`) are accepted as aliases.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::Credentials;
use crate::error::ConfigError;

pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const SETTINGS_ENV_VAR: &str = "NETWRIX_MCP_CONFIG";

/// Root settings structure
#[derive(Debug, Deserialize, Default)]
pub struct Settings {
    #[serde(default, alias = "Netwrix")]
    pub netwrix: NetwrixSettings,
    #[serde(default, alias = "Logging")]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize)]
pub struct NetwrixSettings {
    #[serde(default = "default_api_url", alias = "ApiUrl")]
    pub api_url: String,
    #[serde(default, alias = "IsInternalApi")]
    pub is_internal_api: bool,
    #[serde(default, alias = "Credentials")]
    pub credentials: Option<CredentialSettings>,
    #[serde(default = "default_request_timeout", alias = "RequestTimeoutSeconds")]
    pub request_timeout_seconds: u64,
    #[serde(default, alias = "DesktopConfigPath")]
    pub desktop_config_path: Option<PathBuf>,
}

impl Default for NetwrixSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            is_internal_api: false,
            credentials: None,
            request_timeout_seconds: default_request_timeout(),
            desktop_config_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialSettings {
    #[serde(default, alias = "UserName", alias = "username")]
    pub user_name: String,
    #[serde(default, alias = "Password")]
    pub password: String,
}

impl From<CredentialSettings> for Credentials {
    fn from(c: CredentialSettings) -> Self {
        Credentials::new(c.user_name, c.password)
    }
}

/// Log output. The file rolls daily; `file = ""` logs to stderr instead.
#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level", alias = "Level")]
    pub level: String,
    #[serde(default = "default_log_file", alias = "File")]
    pub file: Option<PathBuf>,
    /// Rolled files kept, including the current one.
    #[serde(default = "default_retained_files", alias = "RetainedFiles")]
    pub retained_files: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            retained_files: default_retained_files(),
        }
    }
}

fn default_api_url() -> String { "https://localhost:9699".into() }
fn default_request_timeout() -> u64 { 100 }
fn default_log_level() -> String { "info".into() }
fn default_log_file() -> Option<PathBuf> { Some(PathBuf::from("logs/netwrix-auditor-mcp.log")) }
fn default_retained_files() -> usize { 7 }

impl Settings {
    /// Read settings from `path`. A missing file is not an error and yields `None`.
    pub fn load(path: &Path) -> Result<Option<Settings>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path).map(Some)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Settings, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::SettingsParse {
            path: origin.to_path_buf(),
            source,
        })
    }
}

/// Directory of the running executable; relative paths in settings resolve here.
pub fn base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn resolve_relative(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir().join(path)
    }
}

/// Settings file location: explicit path, then `NETWRIX_MCP_CONFIG`, then
/// `settings.toml` next to the executable.
pub fn settings_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var(SETTINGS_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => base_dir().join(SETTINGS_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.netwrix.api_url, "https://localhost:9699");
        assert!(!settings.netwrix.is_internal_api);
        assert!(settings.netwrix.credentials.is_none());
        assert_eq!(settings.netwrix.request_timeout_seconds, 100);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(
            settings.logging.file,
            Some(PathBuf::from("logs/netwrix-auditor-mcp.log"))
        );
        assert_eq!(settings.logging.retained_files, 7);
    }

    #[test]
    fn test_parse_snake_case() {
        let toml_str = r#"
[netwrix]
api_url = "https://auditor.corp:9699"
is_internal_api = true
request_timeout_seconds = 30

[netwrix.credentials]
user_name = "CORP\\svc"
password = "pw"

[logging]
level = "debug"
file = "logs/server.log"
retained_files = 3
"#;
        let settings = Settings::parse(toml_str, Path::new("inline")).unwrap();
        assert_eq!(settings.netwrix.api_url, "https://auditor.corp:9699");
        assert!(settings.netwrix.is_internal_api);
        assert_eq!(settings.netwrix.request_timeout_seconds, 30);
        let creds = settings.netwrix.credentials.unwrap();
        assert_eq!(creds.user_name, "CORP\\svc");
        assert_eq!(creds.password, "pw");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.file, Some(PathBuf::from("logs/server.log")));
        assert_eq!(settings.logging.retained_files, 3);
    }

    #[test]
    fn test_parse_pascal_case_aliases() {
        let toml_str = r#"
[Netwrix]
ApiUrl = "https://nwx:9699"
IsInternalApi = true

[Netwrix.Credentials]
UserName = "admin"
Password = "secret"
"#;
        let settings = Settings::parse(toml_str, Path::new("inline")).unwrap();
        assert_eq!(settings.netwrix.api_url, "https://nwx:9699");
        assert!(settings.netwrix.is_internal_api);
        assert_eq!(settings.netwrix.credentials.unwrap().user_name, "admin");
    }

    #[test]
    fn test_parse_invalid_is_error() {
        let err = Settings::parse("[netwrix\napi_url = ", Path::new("broken.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::SettingsParse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_missing_file() {
        let loaded = Settings::load(Path::new("/nonexistent/settings.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[netwrix]\napi_url = \"https://file:1\"\n").unwrap();

        let settings = Settings::load(&path).unwrap().unwrap();
        assert_eq!(settings.netwrix.api_url, "https://file:1");
    }

    #[test]
    fn test_settings_path_explicit_wins() {
        let path = settings_path(Some(Path::new("/tmp/custom.toml")));
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_resolve_relative_keeps_absolute() {
        let abs = PathBuf::from("/var/log/netwrix.log");
        assert_eq!(resolve_relative(&abs), abs);
        assert!(resolve_relative(Path::new("logs/x.log")).ends_with("logs/x.log"));
    }
}
