//! Implementation of the `dbadmin-config show` command.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Settings;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Show only the server with this 1-based index
    #[arg(long)]
    pub server: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
#[serde(untagged)]
pub enum ShowOutput {
    All(Settings),
    Server(crate::domain::models::ServerConfig),
}

impl CommandOutput for ShowOutput {
    fn to_human(&self) -> String {
        // Secrets serialize as a mask, so YAML is safe to print as-is
        serde_yaml::to_string(self).unwrap_or_default()
    }
}

pub fn execute(args: ShowArgs, config: &Path, json_mode: bool) -> Result<()> {
    let settings = super::check::load(config)?;

    let result = match args.server {
        None => ShowOutput::All(settings),
        Some(index) => {
            let server = settings.server(index).cloned().ok_or_else(|| {
                anyhow::anyhow!(
                    "No server with index {index}; {} configured",
                    settings.servers().len()
                )
            })?;
            ShowOutput::Server(server)
        }
    };

    output(&result, json_mode);
    Ok(())
}
