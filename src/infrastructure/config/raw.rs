//! Source-shaped configuration, keyed with the phpMyAdmin setting names.
//!
//! These structs are what figment extracts into. They are deliberately
//! loose (ports may be strings, indices may be negative) so that bad values
//! reach validation and come back as a `ConfigError` naming the rule rather
//! than as a generic type mismatch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value that may be written as an integer or as a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Global settings block plus the server list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(rename = "blowfish_secret", default)]
    pub blowfish_secret: String,

    #[serde(rename = "Servers", default)]
    pub servers: Vec<RawServer>,

    #[serde(rename = "UploadDir", default)]
    pub upload_dir: String,

    #[serde(rename = "SaveDir", default)]
    pub save_dir: String,

    #[serde(rename = "MaxSizeForInputField", default = "default_max_input_field_size")]
    pub max_input_field_size: u64,

    #[serde(rename = "ExecTimeLimit", default = "default_exec_time_limit")]
    pub exec_time_limit: u64,

    #[serde(rename = "MemoryLimit", default = "default_memory_limit")]
    pub memory_limit: Scalar,

    #[serde(rename = "DefaultLang", default = "default_lang")]
    pub default_lang: String,

    #[serde(rename = "ServerDefault", default = "default_server")]
    pub server_default: i64,
}

const fn default_max_input_field_size() -> u64 {
    50 * 1024 * 1024
}

const fn default_exec_time_limit() -> u64 {
    300
}

const fn default_memory_limit() -> Scalar {
    Scalar::Int(-1)
}

pub(crate) fn default_lang() -> String {
    "en".to_string()
}

const fn default_server() -> i64 {
    1
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            blowfish_secret: String::new(),
            servers: vec![],
            upload_dir: String::new(),
            save_dir: String::new(),
            max_input_field_size: default_max_input_field_size(),
            exec_time_limit: default_exec_time_limit(),
            memory_limit: default_memory_limit(),
            default_lang: default_lang(),
            server_default: default_server(),
        }
    }
}

/// One `Servers[i]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawServer {
    #[serde(default)]
    pub auth_type: crate::domain::models::AuthMode,

    #[serde(default = "default_host")]
    pub host: String,

    /// Absent or empty means the standard MySQL port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Scalar>,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub compress: bool,

    #[serde(rename = "AllowNoPassword", default)]
    pub allow_no_password: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_user() -> String {
    "root".to_string()
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            auth_type: crate::domain::models::AuthMode::default(),
            host: default_host(),
            port: None,
            user: default_user(),
            password: String::new(),
            compress: false,
            allow_no_password: false,
            verbose: None,
        }
    }
}
