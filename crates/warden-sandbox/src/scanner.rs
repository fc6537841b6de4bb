// scanner.rs — The scanner seam and the CLI subprocess implementation.
//
// CliSkillScanner runs:
//
//   <binary> scan <skills_dir> --format json --severity-threshold <level>
//
// with a hard wall-clock timeout. The child is killed when the timeout
// drops the future. Many scanners exit non-zero when they find something,
// so a parseable report on stdout is accepted regardless of exit status.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ScanError;
use crate::report::{ScanReport, Severity};

/// Static analysis of the skills directory.
#[async_trait]
pub trait SkillScanner: Send + Sync {
    async fn scan(&self, skills_dir: &Path, threshold: Severity) -> Result<ScanReport, ScanError>;

    fn name(&self) -> &str;
}

/// Runs an external scanner binary and parses its JSON report.
pub struct CliSkillScanner {
    binary: String,
    timeout: Duration,
}

impl CliSkillScanner {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn resolve(&self) -> Result<PathBuf, ScanError> {
        which::which(&self.binary).map_err(|_| ScanError::NotFound {
            binary: self.binary.clone(),
        })
    }
}

#[async_trait]
impl SkillScanner for CliSkillScanner {
    async fn scan(&self, skills_dir: &Path, threshold: Severity) -> Result<ScanReport, ScanError> {
        let program = self.resolve()?;

        let child = Command::new(&program)
            .arg("scan")
            .arg(skills_dir)
            .args(["--format", "json", "--severity-threshold", threshold.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScanError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match ScanReport::parse(&stdout) {
            Ok(report) => Ok(report),
            Err(_) if !output.status.success() => Err(ScanError::Crashed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        &self.binary
    }
}
