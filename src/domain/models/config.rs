use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::memory_limit::MemoryLimit;
use super::redacted::Redacted;

/// Placeholder in `UploadDir`/`SaveDir` replaced with the logged-in user
pub const USER_PLACEHOLDER: &str = "%u";

/// How the host application obtains database credentials for a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Login form; the session is kept in an encrypted cookie
    #[default]
    Cookie,
    /// Credentials come straight from the configuration
    Config,
    /// HTTP basic authentication
    Http,
    /// Credentials handed over by an external single sign-on script
    Signon,
}

impl AuthMode {
    /// Whether the operator is asked for credentials interactively
    pub const fn prompts_for_credentials(self) -> bool {
        matches!(self, Self::Cookie | Self::Http)
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cookie => "cookie",
            Self::Config => "config",
            Self::Http => "http",
            Self::Signon => "signon",
        })
    }
}

/// One configured database server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    /// Credential flow
    pub auth_mode: AuthMode,

    /// Hostname or IP address
    pub host: String,

    /// TCP port, 1-65535
    pub port: u16,

    /// Database user
    pub user: String,

    /// Database password, empty only when `allow_no_password` is set
    pub password: Redacted,

    /// Request compressed transport
    pub compress: bool,

    /// Permit a login attempt with an empty password
    pub allow_no_password: bool,

    /// Display label shown instead of the host name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<String>,
}

impl ServerConfig {
    /// Label used when listing servers
    pub fn display_name(&self) -> &str {
        self.verbose.as_deref().unwrap_or(&self.host)
    }
}

/// Global settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    /// Cookie-encryption key, exactly 32 bytes
    pub secret: Redacted,

    /// Directory imports are read from; `None` means the default location
    pub upload_dir: Option<PathBuf>,

    /// Directory exports are written to; `None` means the default location
    pub save_dir: Option<PathBuf>,

    /// Largest accepted inline field, in bytes
    pub max_input_field_size: u64,

    /// Per-request execution limit in seconds, 0 = unlimited
    pub exec_time_limit_secs: u64,

    /// Memory ceiling forwarded to the runtime
    pub memory_limit: MemoryLimit,

    /// Locale tag
    pub default_lang: String,

    /// 1-based index of the server selected by default
    pub default_server_index: usize,
}

impl AppConfig {
    /// Execution limit, `None` when unlimited
    pub const fn exec_time_limit(&self) -> Option<Duration> {
        match self.exec_time_limit_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Upload directory with `%u` replaced by `user`
    pub fn upload_dir_for(&self, user: &str) -> Option<PathBuf> {
        self.upload_dir.as_deref().map(|dir| expand_user(dir, user))
    }

    /// Save directory with `%u` replaced by `user`
    pub fn save_dir_for(&self, user: &str) -> Option<PathBuf> {
        self.save_dir.as_deref().map(|dir| expand_user(dir, user))
    }
}

fn expand_user(dir: &Path, user: &str) -> PathBuf {
    PathBuf::from(dir.to_string_lossy().replace(USER_PLACEHOLDER, user))
}

/// Validated configuration: global settings plus the ordered server list.
///
/// Only the loader builds one, so `default_server_index` always points at
/// an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    app: AppConfig,
    servers: Vec<ServerConfig>,
}

impl Settings {
    pub(crate) const fn new(app: AppConfig, servers: Vec<ServerConfig>) -> Self {
        Self { app, servers }
    }

    /// Global settings
    pub const fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Servers in index order; position `n` is server `n + 1`
    pub fn servers(&self) -> &[ServerConfig] {
        &self.servers
    }

    /// Server by its 1-based index
    pub fn server(&self, index: usize) -> Option<&ServerConfig> {
        index.checked_sub(1).and_then(|i| self.servers.get(i))
    }

    /// The server selected by `ServerDefault`
    pub fn default_server(&self) -> &ServerConfig {
        &self.servers[self.app.default_server_index - 1]
    }
}
