//! Domain layer: the validated configuration values handed to the host
//! application.

pub mod models;
