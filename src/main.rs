//! MCP engine stdio binary - main entry point.
//!
//! Wires configuration, tracing, built-in tools, and the newline-delimited
//! JSON-RPC server over stdin/stdout.

use clap::Parser;
use mcp_engine::engine::Engine;
use mcp_engine::plugins::builtin::install_builtins;
use mcp_engine::rpc::RpcServer;
use mcp_engine::Config;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "mcp-engine", about = "MCP tool-invocation engine over stdio")]
struct Args {
    /// Emit logs as JSON (same as MCP_ENGINE_LOG_FORMAT=json).
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if args.json_logs {
        // Read by the tracing init below
        std::env::set_var("MCP_ENGINE_LOG_FORMAT", "json");
    }

    mcp_engine::observability::init_tracing();

    let config = Config::from_env();
    let engine = Arc::new(Engine::new(&config));
    install_builtins(&engine, &config)?;

    tracing::info!(
        tools = engine.registry().tool_count(),
        "MCP engine serving on stdio"
    );

    let server = RpcServer::new(engine);
    tokio::select! {
        result = server.run(tokio::io::stdin(), tokio::io::stdout()) => {
            result?;
            tracing::info!("stdin closed, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
    }

    Ok(())
}
