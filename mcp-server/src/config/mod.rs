//! Netwrix API configuration: resolved values and the sources they merge from
//!
//! Resolution runs once at startup. Base settings supply defaults; the
//! desktop-app config file, when it names one of our server entries,
//! overrides them field by field.

pub mod desktop;
pub mod resolver;

pub use resolver::ConfigResolver;

use crate::settings::NetwrixSettings;

/// Basic credentials presented to the Netwrix API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Final configuration, immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub credentials: Option<Credentials>,
    pub is_internal_api: bool,
}

impl ResolvedConfig {
    pub fn from_settings(settings: &NetwrixSettings) -> Self {
        Self {
            api_url: settings.api_url.clone(),
            credentials: settings
                .credentials
                .clone()
                .filter(|c| !c.user_name.trim().is_empty())
                .map(Credentials::from),
            is_internal_api: settings.is_internal_api,
        }
    }

    /// Username for log lines, never the password.
    pub fn username_for_log(&self) -> &str {
        self.credentials
            .as_ref()
            .map(|c| c.username.as_str())
            .unwrap_or("<null>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CredentialSettings;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2");
        let out = format!("{creds:?}");
        assert!(out.contains("admin"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_from_default_settings() {
        let config = ResolvedConfig::from_settings(&NetwrixSettings::default());
        assert_eq!(config.api_url, "https://localhost:9699");
        assert!(config.credentials.is_none());
        assert!(!config.is_internal_api);
        assert_eq!(config.username_for_log(), "<null>");
    }

    #[test]
    fn test_blank_base_username_means_no_credentials() {
        let mut settings = NetwrixSettings::default();
        settings.credentials = Some(CredentialSettings {
            user_name: "  ".into(),
            password: "pw".into(),
        });
        assert!(ResolvedConfig::from_settings(&settings).credentials.is_none());

        settings.credentials = Some(CredentialSettings {
            user_name: "admin".into(),
            password: "pw".into(),
        });
        assert_eq!(
            ResolvedConfig::from_settings(&settings).credentials,
            Some(Credentials::new("admin", "pw"))
        );
    }
}
