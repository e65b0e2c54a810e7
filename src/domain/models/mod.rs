pub mod config;
pub mod memory_limit;
pub mod redacted;

pub use config::{AppConfig, AuthMode, ServerConfig, Settings, USER_PLACEHOLDER};
pub use memory_limit::{MemoryLimit, ParseMemoryLimitError};
pub use redacted::Redacted;
