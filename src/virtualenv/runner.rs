use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{ProbeError, Result};

/// Output of one shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was killed by a signal.
    pub exit_status: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Whose permission bits a file check looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Who {
    Owner,
    Group,
    Others,
}

impl Who {
    fn mask(self, read: u32) -> u32 {
        match self {
            Who::Owner => read << 6,
            Who::Group => read << 3,
            Who::Others => read,
        }
    }
}

/// Executes commands and file checks on the host under test.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run_command(&self, command: &str) -> Result<CommandResult>;
    async fn check_file_is_executable(&self, path: &Path, who: Who) -> Result<bool>;
    async fn check_file_is_readable(&self, path: &Path, who: Who) -> Result<bool>;
}

/// Runs everything on the local machine through `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner;

impl LocalRunner {
    async fn mode_has(path: &Path, bits: u32) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file() && meta.permissions().mode() & bits == bits,
            Err(e) => {
                log::debug!("Cannot stat {}: {e}", path.display());
                false
            }
        }
    }
}

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run_command(&self, command: &str) -> Result<CommandResult> {
        log::debug!("Running `{command}`");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| ProbeError::Command(format!("{command}: {e}")))?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status: output.status.code().unwrap_or(-1),
        })
    }

    async fn check_file_is_executable(&self, path: &Path, who: Who) -> Result<bool> {
        Ok(Self::mode_has(path, who.mask(0o1)).await)
    }

    async fn check_file_is_readable(&self, path: &Path, who: Who) -> Result<bool> {
        Ok(Self::mode_has(path, who.mask(0o4)).await)
    }
}
