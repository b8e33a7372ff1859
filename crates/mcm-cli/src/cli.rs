use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use client_core::{ClientResult, default_credentials_path};

#[derive(Debug, Parser)]
#[command(name = "mcm", version, about = "MySQL connection manager with SSH tunneling")]
pub struct McmArgs {
    /// Credential store to use instead of ~/.config/mcm/credentials.toml
    #[arg(long, global = true, value_name = "PATH", env = "MCM_CREDENTIALS")]
    pub credentials: Option<PathBuf>,
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd: McmCommand,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum McmCommand {
    /// Connect to a database, through its SSH tunnel if configured
    #[command(visible_alias = "n")]
    Connect {
        /// Credential alias
        #[arg(value_name = "ALIAS")]
        alias: String,
    },
    /// List credential aliases
    #[command(visible_alias = "l")]
    List,
    /// Edit the credential store in $EDITOR
    #[command(visible_alias = "r")]
    Cred,
}

impl McmArgs {
    /// The store path from `--credentials` or the default location.
    pub fn credentials_path(&self) -> ClientResult<PathBuf> {
        match &self.credentials {
            Some(path) => Ok(path.clone()),
            None => default_credentials_path(),
        }
    }
}
