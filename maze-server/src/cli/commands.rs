//! CLI command execution.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::process::GeneratorOptions;
use crate::server::{self, ServerConfig};
use crate::telemetry;

use super::args::Cli;

impl From<&Cli> for GeneratorOptions {
    fn from(cli: &Cli) -> Self {
        let mut opts = Self::new(cli.generator.as_str()).args(cli.generator_args.iter().cloned());

        if let Some(dir) = &cli.generator_dir {
            opts = opts.working_dir(dir);
        }

        if let Some(secs) = cli.timeout_secs.filter(|&secs| secs > 0) {
            opts = opts.timeout(Duration::from_secs(secs));
        }

        opts
    }
}

impl From<&Cli> for ServerConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            host: cli.host.clone(),
            port: cli.port,
            generator: GeneratorOptions::from(cli),
            log_file: cli.log_file.clone(),
            echo_audit: !cli.quiet,
            max_concurrent_jobs: cli.max_concurrent_jobs,
            jobs_per_session: cli.max_jobs_per_session.get(),
            static_dir: cli.static_dir.clone(),
            reply_errors: cli.reply_errors,
        }
    }
}

/// Execute the CLI.
pub async fn execute(cli: Cli) -> Result<()> {
    telemetry::initialise(&cli.log_filter, cli.log_format)
        .context("Failed to initialise diagnostics")?;

    server::start_server(ServerConfig::from(&cli)).await
}
