//! CLI command implementations.

pub mod check;
pub mod secret;
pub mod show;
pub mod watch;
