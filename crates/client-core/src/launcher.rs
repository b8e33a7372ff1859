//! Building and running the database client and the store editor.

use std::{env, path::Path, process::Stdio};

use mcm_types::{Credential, LOOPBACK_HOST};
use secrecy::ExposeSecret;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{ClientError, ClientResult};

/// Editor used when `$EDITOR` is unset.
pub const DEFAULT_EDITOR: &str = "vim";

/// Client invocation connecting straight to the database host.
pub fn direct_command(cred: &Credential) -> Command {
    let port = (cred.port != 0).then_some(cred.port);
    client_command(cred, &cred.host, port)
}

/// Client invocation connecting through the tunnel listener on `port`.
pub fn tunnel_command(cred: &Credential, port: u16) -> Command {
    client_command(cred, LOOPBACK_HOST, Some(port))
}

fn client_command(cred: &Credential, host: &str, port: Option<u16>) -> Command {
    let mut command = Command::new(&cred.command);
    command
        .arg("-h")
        .arg(host)
        .arg("-u")
        .arg(&cred.user)
        .arg(format!("-p{}", cred.password.expose_secret()));
    if let Some(port) = port {
        command.arg("-P").arg(port.to_string());
    }
    if !cred.default_schema.is_empty() {
        command.arg("-D").arg(&cred.default_schema);
    }
    command
}

/// `$EDITOR` (or vim) opening `path`.
pub fn editor_command(path: &Path) -> Command {
    let editor = env::var("EDITOR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
    let mut command = Command::new(editor);
    command.arg(path);
    command
}

/// Run `command` attached to this terminal and wait for it.
///
/// The child is killed if the returned future is dropped.
pub async fn run_foreground(mut command: Command) -> ClientResult<()> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    info!(%program, "launching");
    let status = command
        .status()
        .await
        .map_err(|source| ClientError::Launch {
            program: program.clone(),
            source,
        })?;
    debug!(%program, %status, "process exited");
    if status.success() {
        Ok(())
    } else {
        Err(ClientError::ClientExited { program, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: &Command) -> Vec<String> {
        command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    fn credential() -> Credential {
        toml::from_str(
            r#"
            alias = "prod"
            host = "db"
            port = 3306
            user = "app"
            pass = "s3cret"
            default_schema = "shop"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn direct_command_targets_database_host() {
        let command = direct_command(&credential());
        assert_eq!(command.as_std().get_program(), "mysql");
        assert_eq!(
            args(&command),
            ["-h", "db", "-u", "app", "-ps3cret", "-P", "3306", "-D", "shop"]
        );
    }

    #[test]
    fn direct_command_omits_unset_port_and_schema() {
        let mut cred = credential();
        cred.port = 0;
        cred.default_schema.clear();
        cred.command = "mariadb".into();
        let command = direct_command(&cred);
        assert_eq!(command.as_std().get_program(), "mariadb");
        assert_eq!(args(&command), ["-h", "db", "-u", "app", "-ps3cret"]);
    }

    #[test]
    fn tunnel_command_always_passes_listener_port() {
        let mut cred = credential();
        cred.port = 0;
        assert_eq!(
            args(&tunnel_command(&cred, 49152)),
            ["-h", "127.0.0.1", "-u", "app", "-ps3cret", "-P", "49152", "-D", "shop"]
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let command = Command::new("mcm-test-no-such-program");
        let err = run_foreground(command).await.unwrap_err();
        assert!(matches!(err, ClientError::Launch { ref program, .. } if program == "mcm-test-no-such-program"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_reported_with_status() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("exit 3");
        match run_foreground(command).await {
            Err(ClientError::ClientExited { status, .. }) => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
