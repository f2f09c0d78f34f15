//! Structural diff between two databases
//!
//! The diff itself is computed by an external tool (`migra` by default). Its stdout is
//! the diff script; the exit code is not treated as a verdict because `migra` exits
//! non-zero whenever it finds differences.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::{ConnectionDescriptor, DEFAULT_DIFF_TIMEOUT_SECONDS, DEFAULT_DIFF_TOOL};
use crate::error::{Error, Result};

pub const URL_SCHEME: &str = "postgresql";

/// Something that can produce a diff script between two databases
#[async_trait]
pub trait DiffTool: Send + Sync {
    /// Statements that would make `target_url` look like `source_url`
    async fn compute_diff(&self, source_url: &str, target_url: &str) -> Result<String>;
}

/// Runs a migra-compatible CLI as a subprocess
#[derive(Debug, Clone)]
pub struct MigraDiffTool {
    program: PathBuf,
    timeout: Duration,
}

impl Default for MigraDiffTool {
    fn default() -> Self {
        Self::new(DEFAULT_DIFF_TOOL, Duration::from_secs(DEFAULT_DIFF_TIMEOUT_SECONDS))
    }
}

impl MigraDiffTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DiffTool for MigraDiffTool {
    async fn compute_diff(&self, source_url: &str, target_url: &str) -> Result<String> {
        let program = self.program.display().to_string();

        let child = Command::new(&self.program)
            .arg("--unsafe")
            .arg(target_url)
            .arg(source_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::DiffTool(format!("Failed to start {}: {}", program, e)))?;

        // Timing out drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::DiffTool(format!(
                    "{} did not finish within {}s",
                    program,
                    self.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| Error::DiffTool(format!("Failed to wait for {}: {}", program, e)))?;

        let Some(code) = output.status.code() else {
            return Err(Error::DiffTool(format!(
                "{} was terminated: {}",
                program, output.status
            )));
        };

        if code != 0 {
            tracing::debug!(
                exit_code = code,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Diff tool exited with non-zero status"
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Renders both databases as URLs and asks the diff tool for the script
pub struct DiffOrchestrator<'a, D: DiffTool> {
    tool: &'a D,
}

impl<'a, D: DiffTool> DiffOrchestrator<'a, D> {
    pub fn new(tool: &'a D) -> Self {
        Self { tool }
    }

    /// Diff script turning `target` into `source`
    pub async fn diff(
        &self,
        source: &ConnectionDescriptor,
        target: &ConnectionDescriptor,
    ) -> Result<String> {
        let source_url = source.to_url(URL_SCHEME)?;
        let target_url = target.to_url(URL_SCHEME)?;

        tracing::debug!(
            source = source.database.as_deref().unwrap_or_default(),
            target = target.database.as_deref().unwrap_or_default(),
            "Computing schema diff"
        );
        self.tool.compute_diff(&source_url, &target_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingTool {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl DiffTool for CapturingTool {
        async fn compute_diff(&self, source_url: &str, target_url: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((source_url.to_string(), target_url.to_string()));
            Ok("alter table t add column x int;".to_string())
        }
    }

    #[tokio::test]
    async fn test_orchestrator_passes_urls() {
        let tool = CapturingTool::default();
        let server: ConnectionDescriptor = "Server=h;Port=1;User Id=u;Password=p".parse().unwrap();

        let diff = DiffOrchestrator::new(&tool)
            .diff(&server.with_database("mydb_temp"), &server.with_database("mydb"))
            .await
            .unwrap();

        assert_eq!(diff, "alter table t add column x int;");
        assert_eq!(
            tool.calls.lock().unwrap().clone(),
            vec![(
                "postgresql://u:p@h:1/mydb_temp".to_string(),
                "postgresql://u:p@h:1/mydb".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_orchestrator_requires_database() {
        let tool = CapturingTool::default();
        let server = ConnectionDescriptor::default();

        let result = DiffOrchestrator::new(&tool).diff(&server, &server).await;

        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(tool.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let tool = MigraDiffTool::new("/nonexistent/migra", Duration::from_secs(5));
        let result = tool.compute_diff("postgresql://s", "postgresql://t").await;
        assert!(matches!(result, Err(Error::DiffTool(_))));
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("fake-migra");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_captures_stdout_with_target_first() {
            let dir = TempDir::new().unwrap();
            let tool = MigraDiffTool::new(script(&dir, r#"echo "$1 $2 $3""#), Duration::from_secs(10));

            let diff = tool
                .compute_diff("postgresql://source", "postgresql://target")
                .await
                .unwrap();

            assert_eq!(diff, "--unsafe postgresql://target postgresql://source\n");
        }

        #[tokio::test]
        async fn test_non_zero_exit_still_returns_output() {
            let dir = TempDir::new().unwrap();
            let tool = MigraDiffTool::new(
                script(&dir, "echo 'drop table t;'\necho oops >&2\nexit 2"),
                Duration::from_secs(10),
            );

            let diff = tool.compute_diff("postgresql://s", "postgresql://t").await.unwrap();

            assert_eq!(diff, "drop table t;\n");
        }

        #[tokio::test]
        async fn test_empty_output() {
            let dir = TempDir::new().unwrap();
            let tool = MigraDiffTool::new(script(&dir, "exit 0"), Duration::from_secs(10));

            let diff = tool.compute_diff("postgresql://s", "postgresql://t").await.unwrap();

            assert_eq!(diff, "");
        }

        #[tokio::test]
        async fn test_timeout() {
            let dir = TempDir::new().unwrap();
            let tool = MigraDiffTool::new(script(&dir, "sleep 30"), Duration::from_millis(200));

            let result = tool.compute_diff("postgresql://s", "postgresql://t").await;

            assert!(matches!(result, Err(Error::DiffTool(message)) if message.contains("did not finish")));
        }

        #[tokio::test]
        async fn test_killed_by_signal() {
            let dir = TempDir::new().unwrap();
            let tool = MigraDiffTool::new(script(&dir, "kill -9 $$"), Duration::from_secs(10));

            let result = tool.compute_diff("postgresql://s", "postgresql://t").await;

            assert!(matches!(result, Err(Error::DiffTool(message)) if message.contains("terminated")));
        }
    }
}
