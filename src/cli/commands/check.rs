//! Implementation of the `dbadmin-config check` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{AuthMode, ServerConfig, Settings};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::runtime_limits::LimitOutcome;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Apply the memory limit to this process after loading
    #[arg(long)]
    pub apply_limits: bool,
}

/// One row of the server listing
#[derive(Debug, serde::Serialize)]
pub struct ServerSummary {
    pub index: usize,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth_mode: AuthMode,
    pub compress: bool,
    pub is_default: bool,
}

impl ServerSummary {
    fn new(index: usize, server: &ServerConfig, default_index: usize) -> Self {
        Self {
            index,
            name: server.display_name().to_string(),
            host: server.host.clone(),
            port: server.port,
            user: server.user.clone(),
            auth_mode: server.auth_mode,
            compress: server.compress,
            is_default: index == default_index,
        }
    }

    pub fn from_settings(settings: &Settings) -> Vec<Self> {
        let default_index = settings.app().default_server_index;
        settings
            .servers()
            .iter()
            .enumerate()
            .map(|(pos, server)| Self::new(pos + 1, server, default_index))
            .collect()
    }
}

/// Render servers as a table, marking the default with `*`
pub fn render_servers(servers: &[ServerSummary]) -> String {
    let mut table = list_table(&["", "#", "name", "host", "port", "user", "auth", "compress"]);
    for server in servers {
        table.add_row(vec![
            if server.is_default { "*" } else { "" }.to_string(),
            server.index.to_string(),
            server.name.clone(),
            server.host.clone(),
            server.port.to_string(),
            server.user.clone(),
            server.auth_mode.to_string(),
            if server.compress { "yes" } else { "no" }.to_string(),
        ]);
    }
    table.to_string()
}

#[derive(Debug, serde::Serialize)]
pub struct CheckOutput {
    pub success: bool,
    pub source: PathBuf,
    pub servers: Vec<ServerSummary>,
    pub default_server: usize,
    pub default_lang: String,
    pub memory_limit: String,
    pub exec_time_limit_secs: u64,
    pub max_input_field_size: u64,
    pub upload_dir: Option<PathBuf>,
    pub save_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_outcome: Option<LimitOutcome>,
}

impl CheckOutput {
    fn new(source: &Path, settings: &Settings, limit_outcome: Option<LimitOutcome>) -> Self {
        let app = settings.app();
        Self {
            success: true,
            source: source.to_path_buf(),
            servers: ServerSummary::from_settings(settings),
            default_server: app.default_server_index,
            default_lang: app.default_lang.clone(),
            memory_limit: app.memory_limit.to_string(),
            exec_time_limit_secs: app.exec_time_limit_secs,
            max_input_field_size: app.max_input_field_size,
            upload_dir: app.upload_dir.clone(),
            save_dir: app.save_dir.clone(),
            limit_outcome,
        }
    }
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Configuration {} is valid.", self.source.display()),
            String::new(),
            render_servers(&self.servers),
            String::new(),
            format!("Default language:   {}", self.default_lang),
            format!("Memory limit:       {}", self.memory_limit),
            format!(
                "Execution limit:    {}",
                match self.exec_time_limit_secs {
                    0 => "unlimited".to_string(),
                    secs => format!("{secs}s"),
                }
            ),
            format!("Max input field:    {} bytes", self.max_input_field_size),
            format!("Upload directory:   {}", display_dir(self.upload_dir.as_deref())),
            format!("Save directory:     {}", display_dir(self.save_dir.as_deref())),
        ];
        match &self.limit_outcome {
            Some(LimitOutcome::Applied { bytes }) => {
                lines.push(format!("\nMemory limit applied ({bytes} bytes)"));
            }
            Some(LimitOutcome::Failed { reason }) => {
                lines.push(format!("\nMemory limit not applied: {reason}"));
            }
            Some(LimitOutcome::Unchanged) | None => {}
        }
        lines.join("\n")
    }
}

fn display_dir(dir: Option<&Path>) -> String {
    dir.map_or_else(|| "(default)".to_string(), |d| d.display().to_string())
}

pub fn execute(args: CheckArgs, config: &Path, json_mode: bool) -> Result<()> {
    let (settings, limit_outcome) = if args.apply_limits {
        let (settings, outcome) = ConfigLoader::from_file(config)
            .load_and_apply()
            .with_context(|| failure_context(config))?;
        (settings, Some(outcome))
    } else {
        (load(config)?, None)
    };

    output(&CheckOutput::new(config, &settings, limit_outcome), json_mode);
    Ok(())
}

fn failure_context(config: &Path) -> String {
    format!("Failed to load configuration from {}", config.display())
}

/// Load `config` with environment overrides, wrapping errors with the path
pub(crate) fn load(config: &Path) -> Result<Settings> {
    ConfigLoader::from_file(config)
        .load()
        .with_context(|| failure_context(config))
}
