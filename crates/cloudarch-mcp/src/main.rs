//! `cloudarch-mcp`: serves the diagram tools over stdio, renders request
//! files offline and registers itself with MCP clients.

mod args;
mod config;
mod init;
mod server;

use std::{fs, path::Path, path::PathBuf, process, str::FromStr};

use clap::Parser;
use log::{debug, error, info, LevelFilter};
use rmcp::ServiceExt;

use cloudarch_core::{
    config::AppConfig, dot, graph, render::file_stem, DiagramRequest, GraphvizRenderer, Provider,
    Render,
};

use crate::args::{Args, Command};
use crate::server::CloudArchServer;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'info' instead.", args.log_level);
        LevelFilter::Info
    });
    // stdout carries the MCP stream.
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .target(env_logger::Target::Stderr)
        .init();
    debug!(args:?; "Parsed arguments");

    if let Err(err) = run(&args).await {
        error!("{err}");
        process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), BoxError> {
    match args.command() {
        Command::Init => Ok(init::init_project()?),
        Command::Serve => {
            let config = config::load_config(args.config.as_deref())?;
            serve(&config).await
        }
        Command::Render {
            provider,
            request,
            output,
            dot_only,
        } => {
            let config = config::load_config(args.config.as_deref())?;
            render_file(&config, *provider, request, output.as_deref(), *dot_only)
        }
    }
}

async fn serve(config: &AppConfig) -> Result<(), BoxError> {
    info!(version = env!("CARGO_PKG_VERSION"); "Starting cloudarch MCP server on stdio");
    let service = CloudArchServer::from_config(config)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| error!("MCP server error: {e}"))?;
    service.waiting().await?;
    info!("Client disconnected, shutting down");
    Ok(())
}

/// Run one request file through the pipeline and write the PNG, or print the
/// DOT text with `dot_only`.
fn render_file(
    config: &AppConfig,
    provider: Provider,
    request: &Path,
    output: Option<&Path>,
    dot_only: bool,
) -> Result<(), BoxError> {
    let arguments: serde_json::Value = serde_json::from_str(&fs::read_to_string(request)?)?;

    let diagram = DiagramRequest::from_arguments(provider, &arguments)?;
    let graph = graph::build(&diagram, provider)?;
    if dot_only {
        print!("{}", dot::to_dot(&graph, config.style()));
        return Ok(());
    }

    let renderer = GraphvizRenderer::from_config(config)?;
    let image = renderer.render(&graph)?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}.png", file_stem(&graph.name))));
    fs::write(&path, &image.bytes)?;
    info!(
        path = path.display().to_string(),
        components = graph.node_count(),
        connections = graph.edge_count();
        "Wrote diagram"
    );
    Ok(())
}
