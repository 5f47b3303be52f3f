//! Two-phase startup
//!
//! [`BootstrapContext`] holds the raw settings needed to start logging.
//! [`BootstrapContext::into_process`] resolves the API configuration and
//! builds the long-lived services, yielding a [`ProcessContext`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::client::{build_transport, ClientOptions};
use crate::config::{ConfigResolver, ResolvedConfig};
use crate::logging;
use crate::mcp::McpServer;
use crate::protect::CredentialProtector;
use crate::records::QueryPipeline;
use crate::settings::{settings_path, Settings};
use crate::tools::ToolSurface;

pub struct BootstrapContext {
    pub settings: Settings,
    settings_found: bool,
    settings_path: PathBuf,
    log_guard: Option<WorkerGuard>,
}

impl BootstrapContext {
    /// Read base settings. A missing file falls back to defaults; an
    /// unparsable one is fatal.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = settings_path(explicit);
        let loaded = Settings::load(&path)?;
        Ok(Self {
            settings_found: loaded.is_some(),
            settings: loaded.unwrap_or_default(),
            settings_path: path,
            log_guard: None,
        })
    }

    /// Install the global subscriber. Call once.
    pub fn init_logging(&mut self) -> Result<()> {
        self.log_guard = logging::init_logging(&self.settings.logging)?;
        if self.settings_found {
            info!("Loaded settings from {}", self.settings_path.display());
        } else {
            warn!(
                "Settings file {} not found, using defaults",
                self.settings_path.display()
            );
        }
        Ok(())
    }

    /// Resolve configuration and build services. Fails only when the API
    /// URL is missing or malformed; the failure is logged before the log
    /// writer is released.
    pub fn into_process(self) -> Result<ProcessContext> {
        match self.build_services() {
            Ok((config, server)) => Ok(ProcessContext {
                config,
                server: Arc::new(server),
                _log_guard: self.log_guard,
            }),
            Err(e) => {
                error!("Fatal configuration error: {e:#}");
                Err(e)
            }
        }
    }

    fn build_services(&self) -> Result<(ResolvedConfig, McpServer)> {
        let protector = CredentialProtector::machine_scoped();
        let resolution = ConfigResolver::new(&self.settings.netwrix, protector).resolve();
        let overrides = resolution.overrides;
        info!(
            api_url = overrides.api_url,
            credentials = overrides.credentials,
            internal_api = overrides.internal_api,
            "Desktop config overrides applied: {}",
            overrides.any()
        );
        let config = resolution.config;

        let options = ClientOptions {
            timeout: Duration::from_secs(self.settings.netwrix.request_timeout_seconds),
        };
        let transport = build_transport(&config, &options)?;
        let pipeline = QueryPipeline::new(Arc::new(transport));

        info!(
            api_url = %config.api_url,
            internal_api = config.is_internal_api,
            "Netwrix API configured"
        );
        let server = McpServer::new(ToolSurface::new(pipeline, config.is_internal_api));
        Ok((config, server))
    }
}

/// Long-lived process state; immutable after construction.
pub struct ProcessContext {
    pub config: ResolvedConfig,
    pub server: Arc<McpServer>,
    /// Flushes the log file when the process context is dropped.
    _log_guard: Option<WorkerGuard>,
}

impl ProcessContext {
    pub async fn run(self) -> Result<()> {
        info!(api_url = %self.config.api_url, "Netwrix Auditor MCP server ready on stdio");
        let result = Arc::clone(&self.server).serve_stdio().await;
        if let Err(e) = &result {
            error!("Server loop failed: {e:#}");
        }
        info!("Netwrix Auditor MCP server shutting down");
        result
    }
}
