//! HTTP boundary to the Netwrix Auditor API
//!
//! Query code talks to [`HttpTransport`] only: a request is a method, a
//! path relative to the API base and an optional JSON body; a response is
//! the status, reason, headers and body text. [`build_transport`] creates
//! the one shared reqwest-backed transport at startup.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::{Credentials, ResolvedConfig};
use crate::error::{ConfigError, TransportError};

/// Fixed API path appended to the configured server URL.
pub const API_BASE_PATH: &str = "/netwrix/api/v1/";
pub const USER_AGENT: &str = concat!("netwrix-auditor-mcp/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path and query, relative to the API base (e.g. `activity_records/enum?format=json`).
    pub path: String,
    /// JSON body, sent as `application/json`.
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    pub status: u16,
    pub reason: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the audit API. Shared by every in-flight tool call.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;

    /// Absolute API base, ending in `/netwrix/api/v1/`.
    fn base_url(&self) -> &Url;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(100),
        }
    }
}

/// Compute the API base URL from the configured server URL.
pub fn api_base_url(api_url: &str) -> Result<Url, ConfigError> {
    let trimmed = api_url.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingApiUrl);
    }

    let full = format!("{}{}", trimmed.trim_end_matches('/'), API_BASE_PATH);
    let url = Url::parse(&full).map_err(|e| ConfigError::InvalidApiUrl {
        url: api_url.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::InvalidApiUrl {
                url: api_url.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            })
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidApiUrl {
            url: api_url.to_string(),
            reason: "missing host".into(),
        });
    }
    Ok(url)
}

/// reqwest-backed transport bound to one API base and credential set.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl ReqwestTransport {
    fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidPath {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(&request.path)?;
        info!("Sending {} request to: {url}", request.method);

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(creds) = &self.credentials {
            builder = builder.basic_auth(&creds.username, Some(&creds.password));
        }
        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        info!("Response status: {} {reason}", status.as_u16());

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await?;
        debug!("Response body length: {}", body.len());

        Ok(ApiResponse {
            status: status.as_u16(),
            reason,
            headers,
            body,
        })
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Build the shared transport. An empty or malformed URL is fatal.
pub fn build_transport(
    config: &ResolvedConfig,
    options: &ClientOptions,
) -> Result<ReqwestTransport, ConfigError> {
    let base_url = api_base_url(&config.api_url)?;
    info!("Configuring HTTP client. BaseAddress: {base_url}");

    warn!("TLS certificate validation is disabled for the Netwrix API connection");
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .user_agent(USER_AGENT)
        .timeout(options.timeout)
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

    let credentials = config
        .credentials
        .clone()
        .filter(|c| !c.username.is_empty());
    match &credentials {
        Some(c) => info!("Using basic credentials for user: {}", c.username),
        None => warn!("No credentials configured. Requests will be sent without authentication."),
    }

    Ok(ReqwestTransport {
        client,
        base_url,
        credentials,
    })
}
