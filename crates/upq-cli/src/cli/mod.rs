//! CLI for the UPQ upload queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use upq_core::config;

use commands::{run_checksum, run_completions, run_config, run_upload, UploadOptions};

/// Top-level CLI for the UPQ upload queue.
#[derive(Debug, Parser)]
#[command(name = "upq")]
#[command(about = "UPQ: concurrent file uploads with retry and live status", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload files through the queue and wait until every job settles.
    Upload {
        /// Files to upload, in submission order.
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
        /// Maximum concurrent uploads (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Automatic retries per file (default from config).
        #[arg(long, value_name = "N")]
        retries: Option<u32>,
        /// Delay before a failed upload is retried, in milliseconds (default from config).
        #[arg(long, value_name = "MS")]
        retry_delay_ms: Option<u64>,
        /// Destination directory for stored objects (default from config).
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,
        /// After the queue settles, retry failed uploads up to N more rounds.
        #[arg(long, default_value = "0", value_name = "N")]
        retry_rounds: u32,
        /// Print events and the summary as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Compute SHA-256 of a file (e.g. to verify a stored object).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Show the config file path and effective configuration.
    Config,

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Upload {
                files,
                jobs,
                retries,
                retry_delay_ms,
                dest,
                retry_rounds,
                json,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let opts = UploadOptions {
                    files,
                    jobs,
                    retries,
                    retry_delay_ms,
                    dest,
                    retry_rounds,
                    json,
                };
                run_upload(&cfg, opts).await?;
            }
            CliCommand::Checksum { path } => run_checksum(&path).await?,
            CliCommand::Config => run_config()?,
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
