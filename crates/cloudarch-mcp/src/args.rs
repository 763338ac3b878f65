//! Command-line arguments for `cloudarch-mcp`.
//!
//! With no subcommand the binary serves MCP on stdio, which is how clients
//! launch it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cloudarch_core::Provider;

/// Architecture diagram MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the diagram tools over stdio (default)
    Serve,

    /// Render a request file without an MCP client
    Render {
        /// Provider whose component types the request uses
        #[arg(short, long, value_parser = parse_provider)]
        provider: Provider,

        /// JSON file holding the tool arguments
        request: PathBuf,

        /// Output PNG path, `<diagram-name>.png` when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the DOT text instead of running Graphviz
        #[arg(long)]
        dot_only: bool,
    },

    /// Register this binary with Claude Code and Codex in the current directory
    Init,
}

impl Args {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}

fn parse_provider(s: &str) -> Result<Provider, String> {
    s.parse()
}
