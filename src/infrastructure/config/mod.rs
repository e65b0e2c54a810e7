//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML or `config.inc.php` source
//! - Environment variable overrides
//! - Validation into immutable settings
//! - Reload by swapping a shared `Arc`

pub mod handle;
pub mod loader;
pub mod php;
pub mod raw;

pub use handle::ConfigHandle;
pub use loader::{
    ConfigError, ConfigLoader, ConfigSource, SourceFormat, DEFAULT_ENV_PREFIX, DEFAULT_PORT,
    SECRET_LEN,
};
pub use php::{PhpConfig, PhpParseError};
