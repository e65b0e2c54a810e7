//! dbadmin-config - configuration loading for a web database administration tool
//!
//! Reads a `config.inc.php`-style configuration (or its YAML equivalent),
//! applies environment overrides and validates the result into immutable
//! [`Settings`]: one [`AppConfig`] plus an ordered list of [`ServerConfig`].
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): validated configuration types
//! - **Infrastructure Layer** (`infrastructure`): sources, loading, reload, logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use dbadmin_config::ConfigLoader;
//!
//! let settings = ConfigLoader::from_file("config.inc.php").load()?;
//! println!("default server: {}", settings.default_server().host);
//! # Ok::<(), dbadmin_config::ConfigError>(())
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::models::{AppConfig, AuthMode, MemoryLimit, Redacted, ServerConfig, Settings};
pub use infrastructure::config::{ConfigError, ConfigHandle, ConfigLoader, ConfigSource};
pub use infrastructure::credentials::generate_secret;
