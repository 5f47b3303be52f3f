//! Netwrix Auditor MCP server
//!
//! Exposes Netwrix Auditor activity-record search to an LLM assistant as
//! MCP tools over stdio. Startup runs in two phases: bootstrap (settings and
//! logging), then process (configuration resolution, HTTP client, tools).

use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

mod cli;
mod client;
mod config;
mod context;
mod error;
mod filter;
mod format;
mod logging;
mod mcp;
mod protect;
mod records;
mod settings;
mod tools;

use cli::{Cli, Command};
use context::BootstrapContext;
use protect::CredentialProtector;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command() {
        Command::Serve => serve(&cli).await,
        Command::Protect { value } => protect_value(value.clone()),
    };

    if let Err(e) = result {
        eprintln!("netwrix-auditor-mcp: {e:#}");
        std::process::exit(1);
    }
}

async fn serve(cli: &Cli) -> Result<()> {
    let mut bootstrap = BootstrapContext::load(cli.config.as_deref())?;
    bootstrap.init_logging()?;

    info!("Netwrix Auditor MCP server v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        working_dir = %std::env::current_dir().unwrap_or_default().display(),
        pid = std::process::id(),
        "Process started"
    );

    let process = bootstrap.into_process()?;
    process.run().await
}

/// Print the protected form of `value` (or stdin) for the desktop config.
fn protect_value(value: Option<String>) -> Result<()> {
    let plaintext = match value {
        Some(v) => v,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read value from stdin")?;
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let protected = CredentialProtector::machine_scoped().protect(&plaintext);
    if !plaintext.is_empty() && protected == plaintext {
        bail!("Failed to protect value: no machine identity available");
    }
    println!("{protected}");
    Ok(())
}
