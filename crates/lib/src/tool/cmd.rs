//! Shell command execution for build phases.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::consts::SOURCE_DATE_EPOCH;

use super::ToolError;

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
  pub stdout: String,
  pub stderr: String,
}

/// Run `cmd` through a shell in `cwd`.
///
/// The environment is inherited, since compilers and CMake are found through
/// `PATH`. `SOURCE_DATE_EPOCH` is pinned and `env` is layered on top.
/// Output is captured; on failure both streams travel with the error.
pub async fn execute_cmd(
  cmd: &str,
  env: &BTreeMap<String, String>,
  cwd: &Path,
  shell: Option<&str>,
) -> Result<CmdOutput, ToolError> {
  info!(cmd = %cmd, "executing command");

  let (shell_cmd, shell_args) = get_shell(shell);

  let mut command = Command::new(&shell_cmd);
  command
    .args(&shell_args)
    .arg(cmd)
    .current_dir(cwd)
    .env("SOURCE_DATE_EPOCH", SOURCE_DATE_EPOCH)
    .envs(env)
    .kill_on_drop(true);

  debug!(shell = %shell_cmd, cwd = %cwd.display(), "spawning process");

  let output = command.output().await?;
  let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
  let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

  if !output.status.success() {
    return Err(ToolError::CmdFailed {
      cmd: cmd.to_string(),
      code: output.status.code(),
      stdout,
      stderr,
    });
  }

  if !stdout.trim().is_empty() {
    debug!(stdout = %stdout.trim_end(), "command output");
  }

  Ok(CmdOutput { stdout, stderr })
}

/// Shell binary and the arguments preceding the command string.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
