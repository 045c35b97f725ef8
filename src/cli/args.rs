//! CLI argument definitions using clap
//!
//! Commands:
//! - flashsafe format --config <path>
//! - flashsafe status --config <path>
//! - flashsafe info --config <path>
//! - flashsafe blob-write --config <path> --input <file>
//! - flashsafe blob-read --config <path> --output <file>
//! - flashsafe log-append --config <path> --data <text>
//! - flashsafe log-dump --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// flashsafe - fail-safe storage on a flash image file
#[derive(Parser, Debug)]
#[command(name = "flashsafe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Format the image for the configured engine
    Format {
        /// Path to configuration file
        #[arg(long, default_value = "./flashsafe.json")]
        config: PathBuf,
    },

    /// Check and repair the image, then report its health
    Status {
        /// Path to configuration file
        #[arg(long, default_value = "./flashsafe.json")]
        config: PathBuf,
    },

    /// Report what the image currently holds
    Info {
        /// Path to configuration file
        #[arg(long, default_value = "./flashsafe.json")]
        config: PathBuf,
    },

    /// Replace the stored blob with the contents of a file
    BlobWrite {
        /// Path to configuration file
        #[arg(long, default_value = "./flashsafe.json")]
        config: PathBuf,

        /// File whose bytes become the new blob
        #[arg(long)]
        input: PathBuf,

        /// Bytes handed to each append call
        #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u32).range(1..))]
        chunk: u32,
    },

    /// Copy the stored blob into a file
    BlobRead {
        /// Path to configuration file
        #[arg(long, default_value = "./flashsafe.json")]
        config: PathBuf,

        /// Destination file
        #[arg(long)]
        output: PathBuf,

        /// First byte to read
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Bytes to read, the rest of the blob when omitted
        #[arg(long)]
        len: Option<usize>,
    },

    /// Append one record to the log
    LogAppend {
        /// Path to configuration file
        #[arg(long, default_value = "./flashsafe.json")]
        config: PathBuf,

        /// Record contents
        #[arg(long)]
        data: String,
    },

    /// Print every record in the log, oldest first
    LogDump {
        /// Path to configuration file
        #[arg(long, default_value = "./flashsafe.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
