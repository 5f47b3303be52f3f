//! Typed errors for startup configuration and the HTTP boundary

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while bootstrapping. Only these may abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Netwrix API URL is not configured. Cannot configure HTTP client.")]
    MissingApiUrl,

    #[error("Invalid Netwrix API URL format: {url} ({reason})")]
    InvalidApiUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failures reported by the HTTP boundary before a status code is known.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("{0}")]
    Network(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}
