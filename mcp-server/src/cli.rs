use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "netwrix-auditor-mcp")]
#[command(about = "Netwrix Auditor activity-record tools over MCP (stdio)", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (default: $NETWRIX_MCP_CONFIG, then settings.toml next to the executable)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve MCP over stdin/stdout (default)
    Serve,

    /// Protect a password for NETWRIX_API_PASSWORD with NETWRIX_API_PASSWORD_PROTECTED="true"
    Protect {
        /// Value to protect; read from stdin when omitted
        value: Option<String>,
    },
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}
