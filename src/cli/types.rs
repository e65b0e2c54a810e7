//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{check::CheckArgs, secret::SecretArgs, show::ShowArgs, watch::WatchArgs};
use crate::infrastructure::logging::{LogConfig, LogFormat, RotationPolicy};

#[derive(Parser, Debug)]
#[command(name = "dbadmin-config")]
#[command(about = "Load, validate and inspect database-admin configuration", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (.yaml or config.inc.php)
    #[arg(short, long, global = true, env = "DBADMIN_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DBADMIN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Also write JSON logs to a rolling file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for the log file
    #[arg(long, global = true, value_enum, default_value_t = RotationPolicy::Daily)]
    pub log_rotation: RotationPolicy,
}

impl Cli {
    /// Logging configuration derived from the global flags
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            format: self.log_format,
            log_dir: self.log_dir.clone(),
            enable_stderr: true,
            rotation: self.log_rotation,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the configuration
    Check(CheckArgs),

    /// Print the effective configuration with secrets redacted
    Show(ShowArgs),

    /// Generate a fresh 32-byte blowfish_secret
    Secret(SecretArgs),

    /// Load the configuration and reload it on SIGHUP until interrupted
    Watch(WatchArgs),
}
