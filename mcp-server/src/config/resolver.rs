//! Configuration resolution: base settings overridden by the desktop config
//!
//! Precedence: a desktop value replaces the base value only when it is
//! present and differs (credentials also apply when the base has none).
//! Absence in the desktop config never clears a base value. Resolution
//! never fails; a missing URL or credentials is reported and left for the
//! consumers to handle.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::desktop::{
    DesktopConfig, McpServerEntry, ENV_API_PASSWORD, ENV_API_PASSWORD_PROTECTED, ENV_API_URL,
    ENV_API_USERNAME, ENV_INTERNAL_API, SERVER_NAMES,
};
use super::{Credentials, ResolvedConfig};
use crate::protect::CredentialProtector;
use crate::settings::NetwrixSettings;

/// Values extracted from the desktop config, before precedence is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesktopOverrides {
    pub api_url: Option<String>,
    pub credentials: Option<Credentials>,
    pub internal_api: Option<bool>,
}

impl DesktopOverrides {
    /// Extract overrides from a matched server entry.
    pub fn from_entry(entry: &McpServerEntry, protector: &CredentialProtector) -> Self {
        let mut overrides = Self::default();

        if let Some(url) = entry.env_value(ENV_API_URL).filter(|u| !is_blank(u)) {
            info!("Found {ENV_API_URL} in env: {url}");
            overrides.api_url = Some(url.to_string());
        }

        let username = entry.env_value(ENV_API_USERNAME).unwrap_or("");
        let mut password = entry.env_value(ENV_API_PASSWORD).unwrap_or("").to_string();
        if !password.is_empty() && entry.env_value(ENV_API_PASSWORD_PROTECTED) == Some("true") {
            info!("Password is protected, decrypting...");
            password = protector.unprotect(&password);
        }

        if !is_blank(username) && !is_blank(&password) {
            info!("Found {ENV_API_USERNAME} and {ENV_API_PASSWORD} in env for user: {username}");
            overrides.credentials = Some(Credentials::new(username, password));
        } else if !is_blank(username) || !is_blank(&password) {
            warn!(
                "Only {ENV_API_USERNAME} or {ENV_API_PASSWORD} found in env, but not both. \
                 Credentials will not be used from this source."
            );
        }

        // Key present but empty means false; key absent means no override.
        if let Some(raw) = entry.env_value(ENV_INTERNAL_API) {
            let flag = !is_blank(raw);
            info!("Found {ENV_INTERNAL_API} flag in env: {flag} (raw: '{raw}')");
            overrides.internal_api = Some(flag);
        }

        overrides
    }

    pub fn is_empty(&self) -> bool {
        self.api_url.is_none() && self.credentials.is_none() && self.internal_api.is_none()
    }
}

/// Which fields the desktop config actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedOverrides {
    pub api_url: bool,
    pub credentials: bool,
    pub internal_api: bool,
}

impl AppliedOverrides {
    pub fn any(&self) -> bool {
        self.api_url || self.credentials || self.internal_api
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: ResolvedConfig,
    pub overrides: AppliedOverrides,
}

/// Merges base settings with the desktop config.
pub struct ConfigResolver<'a> {
    base: &'a NetwrixSettings,
    desktop_path: Option<PathBuf>,
    protector: CredentialProtector,
}

impl<'a> ConfigResolver<'a> {
    /// Resolver reading the desktop config from the settings override or
    /// the platform default location.
    pub fn new(base: &'a NetwrixSettings, protector: CredentialProtector) -> Self {
        let desktop_path = base
            .desktop_config_path
            .clone()
            .or_else(DesktopConfig::default_path);
        Self {
            base,
            desktop_path,
            protector,
        }
    }

    #[cfg(test)]
    pub fn with_desktop_path(mut self, path: Option<PathBuf>) -> Self {
        self.desktop_path = path;
        self
    }

    pub fn resolve(&self) -> Resolution {
        info!("=== Starting Netwrix Configuration Loading ===");

        let mut config = ResolvedConfig::from_settings(self.base);
        debug!(
            "Values from base settings: ApiUrl='{}', IsInternalApi='{}', Credentials User='{}'",
            config.api_url,
            config.is_internal_api,
            config.username_for_log()
        );

        let overrides = self.load_desktop_overrides();
        let applied = apply_overrides(&mut config, &overrides);

        if !applied.any() {
            info!("Values from desktop config not found or do not differ from base settings.");
        }
        if config.credentials.is_none() {
            warn!("Final configuration: Credentials for Netwrix API not found. Authentication may fail.");
        }
        if config.api_url.trim().is_empty() {
            warn!("Final configuration: Netwrix API URL not found. API operation is impossible.");
        }
        info!(
            "Final configuration: ApiUrl='{}', IsInternalApi='{}', Credentials User='{}'",
            config.api_url,
            config.is_internal_api,
            config.username_for_log()
        );

        Resolution {
            config,
            overrides: applied,
        }
    }

    /// Best effort: any read or parse failure means no overrides.
    fn load_desktop_overrides(&self) -> DesktopOverrides {
        let Some(path) = self.desktop_path.as_deref() else {
            info!("No desktop config location available on this platform");
            return DesktopOverrides::default();
        };
        info!("Desktop config path: {}", path.display());

        let desktop = match DesktopConfig::load(path) {
            Ok(Some(desktop)) => desktop,
            Ok(None) => {
                info!("Configuration file '{}' not found.", path.display());
                return DesktopOverrides::default();
            }
            Err(e) => {
                warn!(error = %e, "Error reading or parsing '{}' file", path.display());
                return DesktopOverrides::default();
            }
        };

        let names = desktop.server_names();
        info!("Found {} MCP servers in configuration: {}", names.len(), names.join(", "));

        match desktop.find_server() {
            Some((name, entry)) => {
                info!("Found server configuration under name: {name}");
                if entry.env.is_none() {
                    info!("Server '{name}' has no env section");
                }
                let overrides = DesktopOverrides::from_entry(entry, &self.protector);
                if overrides.is_empty() {
                    info!("Server '{name}' sets no Netwrix overrides");
                }
                overrides
            }
            None => {
                info!(
                    "No matching server configuration found in mcpServers section of '{}'. Tried: {}",
                    path.display(),
                    SERVER_NAMES.join(", ")
                );
                DesktopOverrides::default()
            }
        }
    }
}

/// Apply desktop overrides onto `config` in place.
pub fn apply_overrides(config: &mut ResolvedConfig, overrides: &DesktopOverrides) -> AppliedOverrides {
    let mut applied = AppliedOverrides::default();

    if let Some(url) = &overrides.api_url {
        if &config.api_url != url {
            info!("ApiUrl from desktop config ({url}) overrides base value ({}).", config.api_url);
            config.api_url = url.clone();
            applied.api_url = true;
        }
    }

    if let Some(creds) = &overrides.credentials {
        let base_user = config.credentials.as_ref().map(|c| c.username.as_str());
        if base_user != Some(creds.username.as_str()) {
            info!(
                "Credentials from desktop config (user: {}) override base value (user: {}).",
                creds.username,
                base_user.unwrap_or("<null>")
            );
            config.credentials = Some(creds.clone());
            applied.credentials = true;
        }
    }

    if let Some(flag) = overrides.internal_api {
        if config.is_internal_api != flag {
            info!(
                "InternalAPI flag from desktop config ({flag}) overrides base value ({}).",
                config.is_internal_api
            );
            config.is_internal_api = flag;
            applied.internal_api = true;
        }
    }

    applied
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
