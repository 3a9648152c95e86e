use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::runner::{CommandRunner, Who};
use crate::error::Result;

static PIP_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^pip (\d+\S+)").expect("static pip pattern"));
static PYTHON_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[Pp]ython (\d+\S+)").expect("static python pattern"));

/// Integrity and version checks for a Python virtualenv rooted at `root`.
///
/// Version and freeze lookups run their command once and are cached.
pub struct Virtualenv<R> {
    root: PathBuf,
    runner: R,
    pip_version: Option<String>,
    python_version: Option<String>,
    pip_freeze: Option<BTreeMap<String, String>>,
}

impl<R: CommandRunner> Virtualenv<R> {
    pub fn new(root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            root: root.into(),
            runner,
            pip_version: None,
            python_version: None,
            pip_freeze: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bin(&self, name: &str) -> PathBuf {
        self.root.join("bin").join(name)
    }

    /// pip and python executable, activate readable and exporting VIRTUAL_ENV.
    pub async fn is_virtualenv(&self) -> Result<bool> {
        let activate = self.bin("activate");

        if !self
            .runner
            .check_file_is_executable(&self.bin("pip"), Who::Owner)
            .await?
        {
            return Ok(false);
        }
        if !self
            .runner
            .check_file_is_executable(&self.bin("python"), Who::Owner)
            .await?
        {
            return Ok(false);
        }
        if !self.runner.check_file_is_readable(&activate, Who::Owner).await? {
            return Ok(false);
        }

        let grep = format!("grep -q 'export VIRTUAL_ENV' {}", shell_quote(&activate));
        Ok(self.runner.run_command(&grep).await?.success())
    }

    /// Version reported by `pip --version`, or an empty string.
    pub async fn pip_version(&mut self) -> Result<String> {
        if let Some(version) = &self.pip_version {
            return Ok(version.clone());
        }

        let command = format!("{} --version", shell_quote(&self.bin("pip")));
        let output = self.runner.run_command(&command).await?;
        let version = first_capture(&PIP_VERSION, &output.stdout).unwrap_or_default();

        self.pip_version = Some(version.clone());
        Ok(version)
    }

    /// Version reported by `python --version`, or an empty string. Python 2
    /// prints it on stderr, Python 3 on stdout.
    pub async fn python_version(&mut self) -> Result<String> {
        if let Some(version) = &self.python_version {
            return Ok(version.clone());
        }

        let command = format!("{} --version", shell_quote(&self.bin("python")));
        let output = self.runner.run_command(&command).await?;
        let version = first_capture(&PYTHON_VERSION, &output.stderr)
            .or_else(|| first_capture(&PYTHON_VERSION, &output.stdout))
            .unwrap_or_default();

        self.python_version = Some(version.clone());
        Ok(version)
    }

    /// Packages from `pip freeze`. Editable (`-e ...`) lines are keys with an
    /// empty value; a failing pip yields an empty map.
    pub async fn pip_freeze(&mut self) -> Result<BTreeMap<String, String>> {
        if let Some(freeze) = &self.pip_freeze {
            return Ok(freeze.clone());
        }

        let command = format!("{} freeze", shell_quote(&self.bin("pip")));
        let output = self.runner.run_command(&command).await?;
        let freeze = if output.success() {
            parse_freeze(&output.stdout)
        } else {
            log::warn!(
                "`{command}` exited with {}: {}",
                output.exit_status,
                output.stderr.trim()
            );
            BTreeMap::new()
        };

        self.pip_freeze = Some(freeze.clone());
        Ok(freeze)
    }
}

/// Single-quote `path` for `sh -c`; embedded quotes become `'\''`.
fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_freeze(stdout: &str) -> BTreeMap<String, String> {
    let mut packages = BTreeMap::new();
    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.starts_with("-e ") {
            packages.insert(line.to_string(), String::new());
            continue;
        }
        let (name, version) = line.split_once("==").unwrap_or((line, ""));
        packages.insert(name.to_string(), version.to_string());
    }
    packages
}
