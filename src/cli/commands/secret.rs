//! Implementation of the `dbadmin-config secret` command.

use anyhow::Result;
use clap::Args;

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::credentials::generate_secret;

#[derive(Args, Debug)]
pub struct SecretArgs {}

#[derive(Debug, serde::Serialize)]
pub struct SecretOutput {
    pub secret: String,
}

impl CommandOutput for SecretOutput {
    fn to_human(&self) -> String {
        self.secret.clone()
    }
}

pub fn execute(_args: SecretArgs, json_mode: bool) -> Result<()> {
    output(
        &SecretOutput {
            secret: generate_secret(),
        },
        json_mode,
    );
    Ok(())
}
