//! Advisor Server Entry Point
//!
//! Runs the stack advisor over the stdio channel by default, or over the
//! HTTP/SSE channel with `--sse`.

use advisor_mcp::{logging, RequestDispatcher, SseServer, StdioChannel, ToolRegistry};
use clap::Parser;
use std::sync::Arc;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "advisor-mcp", version, about = "Interactive infrastructure stack advisor")]
struct Cli {
    /// Serve over HTTP with Server-Sent Events instead of stdio
    #[arg(long)]
    sse: bool,

    /// Port for the SSE transport
    #[arg(long, default_value_t = 8000, env = "ADVISOR_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    let cli = Cli::parse();

    let registry = Arc::new(ToolRegistry::new());

    let result = if cli.sse {
        logging::log_server_startup(cli.port);
        SseServer::new(registry).serve(cli.port).await
    } else {
        let dispatcher = Arc::new(RequestDispatcher::new(registry));
        StdioChannel::new(dispatcher).run().await
    };

    if let Err(e) = result {
        error!(error = %e, event = "fatal", "Unrecoverable startup failure");
        std::process::exit(1);
    }
}
