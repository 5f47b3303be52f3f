//! Model Context Protocol surface (JSON-RPC over stdio)

pub mod protocol;
pub mod server;

pub use server::McpServer;
