//! Infrastructure layer module
//!
//! Adapters between the configuration domain and the outside world:
//! - Configuration sources and loading
//! - Secret generation
//! - Logging infrastructure
//! - Process runtime limits

pub mod config;
pub mod credentials;
pub mod logging;
pub mod runtime_limits;
