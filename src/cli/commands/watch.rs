//! Implementation of the `dbadmin-config watch` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use super::check::{render_servers, ServerSummary};
use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::{ConfigHandle, ConfigLoader};
use crate::infrastructure::logging::SecretScrubber;

#[derive(Args, Debug)]
pub struct WatchArgs {}

#[derive(Debug, serde::Serialize)]
pub struct WatchEvent {
    pub event: &'static str,
    pub source: PathBuf,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerSummary>,
}

impl CommandOutput for WatchEvent {
    fn to_human(&self) -> String {
        match (self.event, &self.error) {
            (_, Some(error)) => format!("Reload failed, keeping previous configuration: {error}"),
            ("loaded", None) => format!(
                "Watching {} (send SIGHUP to reload, Ctrl-C to stop)\n\n{}",
                self.source.display(),
                render_servers(&self.servers)
            ),
            (_, None) if self.changed => {
                format!("Configuration reloaded.\n\n{}", render_servers(&self.servers))
            }
            (_, None) => "Configuration reloaded, no changes.".to_string(),
        }
    }
}

pub async fn execute(_args: WatchArgs, config: &Path, json_mode: bool) -> Result<()> {
    let handle = ConfigHandle::new(ConfigLoader::from_file(config))
        .with_context(|| format!("Failed to load configuration from {}", config.display()))?;

    output(
        &WatchEvent {
            event: "loaded",
            source: config.to_path_buf(),
            changed: false,
            error: None,
            servers: ServerSummary::from_settings(&handle.current()),
        },
        json_mode,
    );

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let scrubber = SecretScrubber::new();

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                let event = match handle.reload() {
                    Ok(changed) => WatchEvent {
                        event: "reloaded",
                        source: config.to_path_buf(),
                        changed,
                        error: None,
                        servers: if changed {
                            ServerSummary::from_settings(&handle.current())
                        } else {
                            vec![]
                        },
                    },
                    Err(err) => WatchEvent {
                        event: "reload_failed",
                        source: config.to_path_buf(),
                        changed: false,
                        error: Some(scrubber.scrub_message(&err.to_string())),
                        servers: vec![],
                    },
                };
                output(&event, json_mode);
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("interrupted, stopping watch");
                return Ok(());
            }
        }
    }
}
