use std::{process::Stdio, time::Duration};

use babylon_e2e_core::{EnvironmentError, ExecOutput};
use tokio::{io::AsyncWriteExt as _, process::Command, time::timeout};
use tracing::debug;

/// Runs `docker <args>`, feeding `input` on stdin, and fails on a non-zero
/// exit.
pub async fn run_docker(
    args: &[String],
    input: &str,
    timeout_duration: Duration,
) -> Result<ExecOutput, EnvironmentError> {
    let description = describe(args);
    debug!(command = %description, "running docker command");

    let mut command = Command::new("docker");
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| EnvironmentError::Spawn {
        command: description.clone(),
        source,
    })?;

    if let Some(mut stdin) = child.stdin.take() {
        if !input.is_empty() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|source| EnvironmentError::Spawn {
                    command: description.clone(),
                    source,
                })?;
        }
    }

    let output = match timeout(timeout_duration, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(EnvironmentError::Spawn {
                command: description,
                source,
            })
        }
        Err(_) => {
            return Err(EnvironmentError::Timeout {
                command: description,
                timeout: timeout_duration,
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(EnvironmentError::Failed {
            command: description,
            code: output.status.code(),
            stderr,
        });
    }

    Ok(ExecOutput { stdout, stderr })
}

fn describe(args: &[String]) -> String {
    let mut description = String::from("docker");
    if let Some(arg) = args.first() {
        description.push(' ');
        description.push_str(arg);
    }
    description
}
