//! agent-bridge binary.
//!
//! Usage:
//!   AGENT_BASE_URL=http://localhost:8000 agent-bridge serve
//!   agent-bridge serve --mock --bind 0.0.0.0:3001
//!   curl -sN .../run_sse | agent-bridge transcode
//!   agent-bridge transcode capture.sse --chunk-size 1

use std::net::SocketAddr;
use std::path::PathBuf;

use agent_bridge::{serve, transcode, BridgeConfig};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "agent-bridge", about = "Serve a hosted agent to a chat UI over SSE")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP bridge.
    Serve {
        /// Listen address (overrides BRIDGE_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Replay the canned fixture turn instead of calling the agent
        #[arg(long)]
        mock: bool,
    },
    /// Transcode an agent SSE capture to the chat dialect on stdout.
    Transcode {
        /// Capture file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Bytes per read, to exercise line reassembly
        #[arg(long, default_value_t = 4096)]
        chunk_size: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, mock } => {
            let mut config = BridgeConfig::from_env()?;
            if let Some(addr) = bind {
                config = config.with_bind_addr(addr);
            }
            if mock {
                config = config.with_mock_upstream(true);
            }
            serve(&config).await?;
        }
        Command::Transcode { file, chunk_size } => {
            let stdout = tokio::io::stdout();
            let frames = match file {
                Some(path) => transcode(tokio::fs::File::open(path).await?, stdout, chunk_size).await?,
                None => transcode(tokio::io::stdin(), stdout, chunk_size).await?,
            };
            info!(frames, "transcode finished");
        }
    }

    Ok(())
}
