//! Shell-based job execution on the host.

use crate::runner::{LogStore, RunnerConfig, tail};
use async_trait::async_trait;
use brig_core::{Error, JobOutcome, JobRunner, JobSpec, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};

/// Runs job task scripts with `sh -c` on the host.
///
/// Images and the privileged flag are ignored. Jobs run in their mount path
/// when it exists on the host, otherwise in the runner's workspace.
pub struct ShellRunner {
    workspace: PathBuf,
    config: RunnerConfig,
    logs: LogStore,
}

impl ShellRunner {
    pub fn new(workspace: impl Into<PathBuf>, config: RunnerConfig) -> Self {
        Self {
            workspace: workspace.into(),
            config,
            logs: LogStore::new(),
        }
    }

    fn working_dir(&self, job: &JobSpec) -> PathBuf {
        match job.mount_path.as_deref().map(Path::new) {
            Some(path) if path.is_dir() => path.to_path_buf(),
            _ => self.workspace.clone(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(std::env::temp_dir(), RunnerConfig::default())
    }
}

/// Output collected so far, readable while the process still runs.
type SharedOutput = Arc<Mutex<String>>;

fn collect_lines<R>(reader: R, sink: SharedOutput) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Ok(mut out) = sink.lock() {
                out.push_str(&line);
                out.push('\n');
            }
        }
    })
}

fn snapshot(output: &SharedOutput) -> String {
    output.lock().map(|out| out.clone()).unwrap_or_default()
}

#[async_trait]
impl JobRunner for ShellRunner {
    async fn run(&self, job: &JobSpec) -> Result<JobOutcome> {
        let start = std::time::Instant::now();
        let dir = self.working_dir(job);

        info!(job = %job.name, dir = %dir.display(), "Executing job on host");
        self.logs.clear(&job.name).await;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(job.script())
            .current_dir(&dir)
            .envs(&job.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::JobSubmission {
                job: job.name.clone(),
                message: format!("failed to spawn process: {}", e),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("child stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("child stderr not captured".to_string()))?;
        let stdout_buf = SharedOutput::default();
        let stderr_buf = SharedOutput::default();
        let stdout_handle = collect_lines(stdout, stdout_buf.clone());
        let stderr_handle = collect_lines(stderr, stderr_buf.clone());

        let wait_result = match self.config.timeout_seconds {
            Some(timeout_secs) => {
                match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(job = %job.name, timeout_secs, "Job timed out, killing process");
                        let _ = child.kill().await;
                        let mut partial = snapshot(&stdout_buf);
                        partial.push_str(&snapshot(&stderr_buf));
                        self.logs.put(&job.name, partial).await;
                        return Err(Error::JobFailed {
                            job: job.name.clone(),
                            exit_code: -1,
                            message: format!("timed out after {}s", timeout_secs),
                        });
                    }
                }
            }
            None => child.wait().await,
        };

        let _ = stdout_handle.await;
        let _ = stderr_handle.await;
        let mut output = snapshot(&stdout_buf);
        output.push_str(&snapshot(&stderr_buf));

        let status = wait_result.map_err(|e| Error::JobSubmission {
            job: job.name.clone(),
            message: format!("failed to wait for process: {}", e),
        })?;

        let exit_code = i64::from(status.code().unwrap_or(-1));
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(job = %job.name, exit_code, duration_ms, "Job completed");
        self.logs.put(&job.name, output.clone()).await;

        if exit_code != 0 {
            return Err(Error::JobFailed {
                job: job.name.clone(),
                exit_code,
                message: tail(&output, 20),
            });
        }

        Ok(JobOutcome {
            job: job.name.clone(),
            exit_code,
            output,
            duration_ms,
        })
    }

    async fn logs(&self, job: &JobSpec) -> Result<String> {
        self.logs.get(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_runner_success() {
        let runner = ShellRunner::default();
        let job = JobSpec::new("echo", "ignored")
            .env("GREETING", "hello")
            .task("echo $GREETING");

        let outcome = runner.run(&job).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.output, "hello\n");
        assert_eq!(runner.logs(&job).await.unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn test_shell_runner_failure_keeps_logs() {
        let runner = ShellRunner::default();
        let job = JobSpec::new("fails", "ignored")
            .task("echo before")
            .task("exit 3")
            .task("echo never");

        let err = runner.run(&job).await.unwrap_err();
        match err {
            Error::JobFailed { exit_code, .. } => assert_eq!(exit_code, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.logs(&job).await.unwrap(), "before\n");
    }

    #[tokio::test]
    async fn test_shell_runner_timeout() {
        let config = RunnerConfig::default().with_timeout(1);
        let runner = ShellRunner::new(std::env::temp_dir(), config);
        let job = JobSpec::new("slow", "ignored").task("sleep 5");

        let err = runner.run(&job).await.unwrap_err();
        assert!(matches!(err, Error::JobFailed { exit_code: -1, .. }));
    }

    #[tokio::test]
    async fn test_timed_out_rerun_never_reports_earlier_log() {
        let config = RunnerConfig::default().with_timeout(1);
        let runner = ShellRunner::new(std::env::temp_dir(), config);
        let first = JobSpec::new("tests", "ignored").task("echo first run");
        runner.run(&first).await.unwrap();

        let second = JobSpec::new("tests", "ignored")
            .task("echo second run")
            .task("sleep 5");
        let err = runner.run(&second).await.unwrap_err();
        assert!(matches!(err, Error::JobFailed { exit_code: -1, .. }));

        assert_eq!(runner.logs(&second).await.unwrap(), "second run\n");
    }

    #[tokio::test]
    async fn test_spawn_failure_clears_earlier_log() {
        let runner = ShellRunner::default();
        let job = JobSpec::new("tests", "ignored").task("echo ok");
        runner.run(&job).await.unwrap();

        let missing = ShellRunner {
            workspace: PathBuf::from("/definitely/not/here"),
            config: RunnerConfig::default(),
            logs: runner.logs.clone(),
        };
        assert!(missing.run(&job).await.is_err());
        assert!(matches!(runner.logs(&job).await, Err(Error::Logs { .. })));
    }

    #[test]
    fn test_missing_mount_path_falls_back_to_workspace() {
        let runner = ShellRunner::new("/tmp", RunnerConfig::default());
        let job = JobSpec::new("t", "i").mount_path("/definitely/not/here");
        assert_eq!(runner.working_dir(&job), PathBuf::from("/tmp"));
    }
}
