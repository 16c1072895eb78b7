//! CLI argument definitions.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::audit::DEFAULT_LOG_FILE;
use crate::process::DEFAULT_GENERATOR;
use crate::server::DEFAULT_PORT;
use crate::telemetry::{LogFormat, DEFAULT_LOG_FILTER};

/// Maze server - generate mazes over WebSocket
#[derive(Parser, Debug)]
#[command(name = "maze-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "MAZE_SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "MAZE_SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    // === Generator Options ===
    /// Maze generator executable
    #[arg(short, long, env = "MAZE_GENERATOR", default_value = DEFAULT_GENERATOR)]
    pub generator: String,

    /// Extra argument passed to the generator before the size (repeatable)
    #[arg(long = "generator-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub generator_args: Vec<String>,

    /// Working directory for the generator
    #[arg(long)]
    pub generator_dir: Option<PathBuf>,

    /// Kill a generator run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Maximum generator processes running at once across all clients
    #[arg(long, value_name = "N")]
    pub max_concurrent_jobs: Option<usize>,

    /// Generator processes one client may have running at once
    #[arg(long, value_name = "N", default_value_t = NonZeroUsize::MIN)]
    pub max_jobs_per_session: NonZeroUsize,

    /// Send an error document to the client when generation fails
    #[arg(long)]
    pub reply_errors: bool,

    // === Files ===
    /// Audit log file
    #[arg(long, env = "MAZE_AUDIT_LOG", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Serve the visualizer from this directory
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    // === Diagnostics ===
    /// Do not echo audit lines to stdout
    #[arg(short, long)]
    pub quiet: bool,

    /// Diagnostic filter directives, e.g. "maze_server=debug"
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,

    /// Diagnostic output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}
