pub mod cli;

use std::io::Write;

use cli::{McmArgs, McmCommand};
use client_core::{ClientError, ClientResult, connect_alias, edit_credentials, list_aliases};
use tracing::debug;

/// Exit status for failures other than a failing database client.
pub const FAILURE_EXIT_CODE: u8 = 255;

/// Install the stderr subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_tracing(verbosity: u8) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_log_filter(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn default_log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub async fn run(args: McmArgs) -> ClientResult<()> {
    let path = args.credentials_path()?;
    debug!(path = %path.display(), command = ?args.cmd, "running");
    match args.cmd {
        McmCommand::Connect { alias } => connect_alias(&path, &alias).await,
        McmCommand::List => {
            let aliases = list_aliases(&path)?;
            write_aliases(&mut std::io::stdout().lock(), &aliases).map_err(|err| ClientError::Store { path, source: err })
        }
        McmCommand::Cred => edit_credentials(&path).await,
    }
}

/// One alias per line.
pub fn write_aliases(out: &mut impl Write, aliases: &[String]) -> std::io::Result<()> {
    for alias in aliases {
        writeln!(out, "{alias}")?;
    }
    out.flush()
}

/// User-facing rendering of a failed command; tunnel errors carry their phase.
pub fn render_error(err: &ClientError) -> String {
    format!("mcm: {err}")
}

/// A failing database client passes its own exit code through.
pub fn exit_code(err: &ClientError) -> u8 {
    match err {
        ClientError::ClientExited { status, .. } => status
            .code()
            .and_then(|code| u8::try_from(code).ok())
            .unwrap_or(FAILURE_EXIT_CODE),
        _ => FAILURE_EXIT_CODE,
    }
}
