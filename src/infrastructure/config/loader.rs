use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::php::{PhpConfig, PhpParseError};
use super::raw::{self, RawConfig, RawServer, Scalar};
use crate::domain::models::{
    AppConfig, MemoryLimit, ParseMemoryLimitError, Redacted, ServerConfig, Settings,
};
use crate::infrastructure::runtime_limits::{apply_memory_limit, LimitOutcome};

/// Required length of `blowfish_secret`, in bytes
pub const SECRET_LEN: usize = 32;

/// Port used when a server entry leaves `port` absent or empty
pub const DEFAULT_PORT: u16 = 3306;

/// Prefix of environment variables that override global settings
pub const DEFAULT_ENV_PREFIX: &str = "DBADMIN_";

/// Environment variable (without prefix) to setting key
const ENV_KEYS: &[(&str, &str)] = &[
    ("BLOWFISH_SECRET", "blowfish_secret"),
    ("UPLOAD_DIR", "UploadDir"),
    ("SAVE_DIR", "SaveDir"),
    ("MAX_SIZE_FOR_INPUT_FIELD", "MaxSizeForInputField"),
    ("EXEC_TIME_LIMIT", "ExecTimeLimit"),
    ("MEMORY_LIMIT", "MemoryLimit"),
    ("DEFAULT_LANG", "DefaultLang"),
    ("SERVER_DEFAULT", "ServerDefault"),
];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid blowfish_secret length {actual}: must be exactly {} bytes", SECRET_LEN)]
    InvalidSecret { actual: usize },

    #[error("Server {index} ({host}): password is empty and AllowNoPassword is false")]
    MissingCredential { index: usize, host: String },

    #[error("Invalid ServerDefault: {index}. Must be between 1 and {count}")]
    InvalidServerIndex { index: i64, count: usize },

    #[error("Server {index}: invalid port {value:?}. Must be an integer between 1 and 65535")]
    InvalidPort { index: usize, value: String },

    #[error("Invalid MemoryLimit: {0}")]
    InvalidMemoryLimit(#[from] ParseMemoryLimitError),

    #[error("Configuration file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to read configuration file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PHP configuration: {0}")]
    Php(#[from] PhpParseError),

    #[error("Failed to extract configuration: {0}")]
    Extract(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

/// On-disk dialect of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Php,
}

impl SourceFormat {
    /// `.php` files use the PHP dialect, everything else is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("php") => Self::Php,
            _ => Self::Yaml,
        }
    }
}

/// Where the settings come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A file on disk; the format follows the extension
    File(PathBuf),
    /// YAML text held in memory
    Yaml(String),
    /// `config.inc.php` text held in memory
    Php(String),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Yaml(_) => f.write_str("<inline yaml>"),
            Self::Php(_) => f.write_str("<inline php>"),
        }
    }
}

/// Configuration loader with hierarchical merging
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    source: ConfigSource,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Loader for `source` with `DBADMIN_*` environment overrides enabled
    pub fn new(source: ConfigSource) -> Self {
        Self {
            source,
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }

    /// Loader for a file on disk
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ConfigSource::File(path.into()))
    }

    /// Read environment overrides under a different prefix
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Ignore the environment entirely
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// The configured source
    pub const fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Build the merged figment
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. The configured source
    /// 3. Environment variables (prefix, default `DBADMIN_`)
    pub fn figment(&self) -> Result<Figment, ConfigError> {
        let figment = Figment::new().merge(Serialized::defaults(RawConfig::default()));

        let figment = match &self.source {
            ConfigSource::File(path) => {
                let contents = read_source(path)?;
                match SourceFormat::from_path(path) {
                    SourceFormat::Yaml => figment.merge(Yaml::string(&contents)),
                    SourceFormat::Php => figment.merge(contents.parse::<PhpConfig>()?),
                }
            }
            ConfigSource::Yaml(text) => figment.merge(Yaml::string(text)),
            ConfigSource::Php(text) => figment.merge(text.parse::<PhpConfig>()?),
        };

        Ok(match &self.env_prefix {
            Some(prefix) => figment.merge(env_overrides(prefix)),
            None => figment,
        })
    }

    /// Load and validate the configuration
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let raw: RawConfig = self.figment()?.extract()?;
        let settings = Self::validate(raw)?;

        info!(
            source = %self.source,
            servers = settings.servers().len(),
            default_server = %settings.default_server().display_name(),
            "configuration loaded"
        );
        Ok(settings)
    }

    /// Load, then apply the memory limit to this process.
    ///
    /// Failing to apply the limit is logged and reported in the outcome; only
    /// load errors are returned as `Err`.
    pub fn load_and_apply(&self) -> Result<(Settings, LimitOutcome), ConfigError> {
        let settings = self.load()?;
        let outcome = apply_memory_limit(settings.app().memory_limit);
        Ok((settings, outcome))
    }

    /// Validate source values and build the typed configuration
    pub fn validate(raw: RawConfig) -> Result<Settings, ConfigError> {
        // Validate secret length
        if raw.blowfish_secret.len() != SECRET_LEN {
            return Err(ConfigError::InvalidSecret {
                actual: raw.blowfish_secret.len(),
            });
        }

        // Validate credentials
        for (pos, server) in raw.servers.iter().enumerate() {
            if !server.allow_no_password && server.password.is_empty() {
                return Err(ConfigError::MissingCredential {
                    index: pos + 1,
                    host: server.host.clone(),
                });
            }
        }

        // Validate default server index
        let count = raw.servers.len();
        let default_server_index = usize::try_from(raw.server_default)
            .ok()
            .filter(|index| (1..=count).contains(index))
            .ok_or(ConfigError::InvalidServerIndex {
                index: raw.server_default,
                count,
            })?;

        // Validate ports
        let servers = raw
            .servers
            .into_iter()
            .enumerate()
            .map(|(pos, server)| build_server(pos + 1, server))
            .collect::<Result<Vec<_>, _>>()?;

        let memory_limit = raw.memory_limit.to_string().parse::<MemoryLimit>()?;

        let default_lang = if raw.default_lang.trim().is_empty() {
            warn!("DefaultLang is empty, falling back to en");
            raw::default_lang()
        } else {
            raw.default_lang
        };

        let app = AppConfig {
            secret: Redacted::new(raw.blowfish_secret),
            upload_dir: non_empty_path(raw.upload_dir),
            save_dir: non_empty_path(raw.save_dir),
            max_input_field_size: raw.max_input_field_size,
            exec_time_limit_secs: raw.exec_time_limit,
            memory_limit,
            default_lang,
            default_server_index,
        };

        Ok(Settings::new(app, servers))
    }
}

fn read_source(path: &Path) -> Result<String, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::SourceNotFound(path.to_path_buf()));
    }
    debug!(path = %path.display(), "reading configuration file");
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn env_overrides(prefix: &str) -> Env {
    Env::prefixed(prefix)
        .filter_map(|key| env_key(key.as_str()).map(Into::into))
        .lowercase(false)
}

fn env_key(name: &str) -> Option<&'static str> {
    ENV_KEYS
        .iter()
        .find(|(var, _)| var.eq_ignore_ascii_case(name))
        .map(|(_, key)| *key)
}

fn build_server(index: usize, raw: RawServer) -> Result<ServerConfig, ConfigError> {
    let port = parse_port(raw.port.as_ref()).ok_or_else(|| ConfigError::InvalidPort {
        index,
        value: raw.port.as_ref().map(ToString::to_string).unwrap_or_default(),
    })?;

    debug!(index, host = %raw.host, port, auth_mode = %raw.auth_type, "server configured");

    Ok(ServerConfig {
        auth_mode: raw.auth_type,
        host: raw.host,
        port,
        user: raw.user,
        password: Redacted::new(raw.password),
        compress: raw.compress,
        allow_no_password: raw.allow_no_password,
        verbose: raw.verbose.filter(|label| !label.is_empty()),
    })
}

fn parse_port(value: Option<&Scalar>) -> Option<u16> {
    let port = match value {
        None => return Some(DEFAULT_PORT),
        Some(Scalar::Int(n)) => u16::try_from(*n).ok()?,
        Some(Scalar::Text(s)) if s.trim().is_empty() => return Some(DEFAULT_PORT),
        Some(Scalar::Text(s)) => s.trim().parse::<u16>().ok()?,
    };
    (port != 0).then_some(port)
}

fn non_empty_path(value: String) -> Option<PathBuf> {
    if value.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AuthMode;

    const SECRET: &str = "a8b7c6d5e4f3g2h1i0j9k8l7m6n5o4p3";

    fn raw_server() -> RawServer {
        RawServer {
            host: "localhost".to_string(),
            port: Some(Scalar::Int(3306)),
            user: "root".to_string(),
            password: String::new(),
            allow_no_password: true,
            ..RawServer::default()
        }
    }

    fn raw_config() -> RawConfig {
        RawConfig {
            blowfish_secret: SECRET.to_string(),
            servers: vec![raw_server()],
            ..RawConfig::default()
        }
    }

    fn load_yaml(yaml: &str) -> Result<Settings, ConfigError> {
        ConfigLoader::new(ConfigSource::Yaml(yaml.to_string()))
            .without_env()
            .load()
    }

    #[test]
    fn test_validate_valid_config() {
        let settings = ConfigLoader::validate(raw_config()).expect("config should be valid");
        assert_eq!(settings.servers().len(), 1);
        assert_eq!(settings.default_server().port, 3306);
        assert_eq!(settings.app().memory_limit, MemoryLimit::Unlimited);
        assert_eq!(settings.app().default_lang, "en");
        assert_eq!(settings.app().upload_dir, None);
    }

    #[test]
    fn test_validate_short_secret() {
        let config = RawConfig {
            blowfish_secret: "too-short".to_string(),
            ..raw_config()
        };
        let result = ConfigLoader::validate(config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidSecret { actual: 9 }
        ));
    }

    #[test]
    fn test_secret_length_counts_bytes() {
        // 16 two-byte characters: 16 chars, 32 bytes
        let config = RawConfig {
            blowfish_secret: "é".repeat(16),
            ..raw_config()
        };
        assert!(ConfigLoader::validate(config).is_ok());
    }

    #[test]
    fn test_validate_missing_password() {
        let mut config = raw_config();
        config.servers[0].allow_no_password = false;

        match ConfigLoader::validate(config).unwrap_err() {
            ConfigError::MissingCredential { index, host } => {
                assert_eq!(index, 1);
                assert_eq!(host, "localhost");
            }
            other => panic!("Expected MissingCredential error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_server_index_out_of_range() {
        for index in [0, 2, -1] {
            let config = RawConfig {
                server_default: index,
                ..raw_config()
            };
            let result = ConfigLoader::validate(config);
            assert!(
                matches!(
                    result,
                    Err(ConfigError::InvalidServerIndex { index: i, count: 1 }) if i == index
                ),
                "index {index} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_no_servers() {
        let config = RawConfig {
            servers: vec![],
            ..raw_config()
        };
        assert!(matches!(
            ConfigLoader::validate(config).unwrap_err(),
            ConfigError::InvalidServerIndex { index: 1, count: 0 }
        ));
    }

    #[test]
    fn test_validate_invalid_ports() {
        let bad = [
            Scalar::Int(0),
            Scalar::Int(65536),
            Scalar::Int(-5),
            Scalar::Text("abc".to_string()),
            Scalar::Text("70000".to_string()),
        ];
        for port in bad {
            let mut config = raw_config();
            config.servers[0].port = Some(port.clone());
            match ConfigLoader::validate(config) {
                Err(ConfigError::InvalidPort { index: 1, value }) => {
                    assert_eq!(value, port.to_string());
                }
                other => panic!("Expected InvalidPort for {port:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_port_defaults() {
        assert_eq!(parse_port(None), Some(DEFAULT_PORT));
        assert_eq!(parse_port(Some(&Scalar::Text(String::new()))), Some(DEFAULT_PORT));
        assert_eq!(parse_port(Some(&Scalar::Text(" 3307 ".to_string()))), Some(3307));
        assert_eq!(parse_port(Some(&Scalar::Int(65535))), Some(65535));
    }

    #[test]
    fn test_validation_order_secret_first() {
        let mut config = raw_config();
        config.blowfish_secret = String::new();
        config.servers[0].allow_no_password = false;
        config.server_default = 9;
        assert!(matches!(
            ConfigLoader::validate(config).unwrap_err(),
            ConfigError::InvalidSecret { actual: 0 }
        ));
    }

    #[test]
    fn test_validate_invalid_memory_limit() {
        let config = RawConfig {
            memory_limit: Scalar::Text("lots".to_string()),
            ..raw_config()
        };
        assert!(matches!(
            ConfigLoader::validate(config).unwrap_err(),
            ConfigError::InvalidMemoryLimit(_)
        ));
    }

    #[test]
    fn test_empty_default_lang_falls_back() {
        let config = RawConfig {
            default_lang: "  ".to_string(),
            ..raw_config()
        };
        let settings = ConfigLoader::validate(config).unwrap();
        assert_eq!(settings.app().default_lang, "en");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
blowfish_secret: a8b7c6d5e4f3g2h1i0j9k8l7m6n5o4p3
Servers:
  - auth_type: config
    host: db.internal
    port: '3307'
    user: admin
    password: s3cret
    compress: true
  - host: replica.internal
    verbose: Replica
    AllowNoPassword: true
UploadDir: /srv/upload/%u
MaxSizeForInputField: 1024
ExecTimeLimit: 0
MemoryLimit: 512M
DefaultLang: de
ServerDefault: 2
";
        let settings = load_yaml(yaml).expect("YAML should load");

        let first = &settings.servers()[0];
        assert_eq!(first.auth_mode, AuthMode::Config);
        assert_eq!(first.port, 3307);
        assert_eq!(first.password.expose(), "s3cret");
        assert!(first.compress);

        let second = settings.default_server();
        assert_eq!(second.host, "replica.internal");
        assert_eq!(second.port, DEFAULT_PORT);
        assert_eq!(second.user, "root");
        assert_eq!(second.display_name(), "Replica");

        let app = settings.app();
        assert_eq!(app.upload_dir_for("bob"), Some(PathBuf::from("/srv/upload/bob")));
        assert_eq!(app.max_input_field_size, 1024);
        assert_eq!(app.exec_time_limit(), None);
        assert_eq!(app.memory_limit, MemoryLimit::Bytes(512 * 1024 * 1024));
        assert_eq!(app.default_lang, "de");
    }

    #[test]
    fn test_load_and_apply_unlimited_leaves_process_alone() {
        let yaml = format!(
            "blowfish_secret: {SECRET}\nServers:\n  - AllowNoPassword: true\nMemoryLimit: -1\n"
        );
        let (settings, outcome) = ConfigLoader::new(ConfigSource::Yaml(yaml))
            .without_env()
            .load_and_apply()
            .unwrap();
        assert_eq!(settings.app().memory_limit, MemoryLimit::Unlimited);
        assert_eq!(outcome, LimitOutcome::Unchanged);
    }

    #[test]
    fn test_load_and_apply_propagates_load_errors() {
        let loader = ConfigLoader::new(ConfigSource::Yaml("blowfish_secret: short\n".into())).without_env();
        assert!(matches!(
            loader.load_and_apply().unwrap_err(),
            ConfigError::InvalidSecret { actual: 5 }
        ));
    }

    #[test]
    fn test_unknown_auth_type_is_extract_error() {
        let yaml = format!("blowfish_secret: {SECRET}\nServers:\n  - auth_type: kerberos\n");
        assert!(matches!(load_yaml(&yaml).unwrap_err(), ConfigError::Extract(_)));
    }

    #[test]
    fn test_missing_file() {
        let loader = ConfigLoader::from_file("/definitely/not/here/config.yaml").without_env();
        assert!(matches!(loader.load().unwrap_err(), ConfigError::SourceNotFound(_)));
    }

    #[test]
    fn test_source_format_from_path() {
        assert_eq!(SourceFormat::from_path(Path::new("config.inc.php")), SourceFormat::Php);
        assert_eq!(SourceFormat::from_path(Path::new("CONFIG.PHP")), SourceFormat::Php);
        assert_eq!(SourceFormat::from_path(Path::new("config.yaml")), SourceFormat::Yaml);
        assert_eq!(SourceFormat::from_path(Path::new("config")), SourceFormat::Yaml);
    }

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(env_key("UPLOAD_DIR"), Some("UploadDir"));
        assert_eq!(env_key("server_default"), Some("ServerDefault"));
        assert_eq!(env_key("CONFIG"), None);
    }

    #[test]
    fn test_env_override() {
        let yaml = format!(
            "blowfish_secret: {SECRET}\nServers:\n  - AllowNoPassword: true\n  - AllowNoPassword: true\nDefaultLang: en\n"
        );
        temp_env::with_vars(
            [
                ("LOADER_TEST_DEFAULT_LANG", Some("fr")),
                ("LOADER_TEST_SERVER_DEFAULT", Some("2")),
                ("LOADER_TEST_MEMORY_LIMIT", Some("128M")),
                ("LOADER_TEST_UNRELATED", Some("ignored")),
            ],
            || {
                let settings = ConfigLoader::new(ConfigSource::Yaml(yaml.clone()))
                    .with_env_prefix("LOADER_TEST_")
                    .load()
                    .expect("env overrides should load");
                assert_eq!(settings.app().default_lang, "fr");
                assert_eq!(settings.app().default_server_index, 2);
                assert_eq!(
                    settings.app().memory_limit,
                    MemoryLimit::Bytes(128 * 1024 * 1024)
                );
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "blowfish_secret: {SECRET}\nServers:\n  - AllowNoPassword: true\nExecTimeLimit: 60"
        )
        .unwrap();
        file.flush().unwrap();

        let settings = ConfigLoader::from_file(file.path())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(settings.app().exec_time_limit_secs, 60, "File should win");
        assert_eq!(
            settings.app().max_input_field_size,
            50 * 1024 * 1024,
            "Default should persist when not overridden"
        );
    }
}
