//! Maze server - hand out generated mazes over WebSocket.
//!
//! Architecture:
//! - Clients connect over WebSocket and send small JSON commands
//! - `generate` runs the external generator once and relays its stdout
//! - Telemetry commands from the visualizer are only written to the audit log
//! - Every connection, request and outcome lands in an append-only audit log

mod audit;
mod cli;
mod dispatch;
mod metrics;
mod models;
mod process;
mod server;
mod telemetry;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}
