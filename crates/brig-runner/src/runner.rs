//! Shared runner configuration and log capture.

use brig_core::{Error, JobSpec, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Configuration for job execution.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Kill the job after this many seconds. `None` leaves lifetime to the platform.
    pub timeout_seconds: Option<u64>,
    /// Prefix for container names.
    pub name_prefix: Option<String>,
}

impl RunnerConfig {
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

/// Captured job output, keyed by job name.
///
/// A job's log is dropped when a job of the same name starts and replaced
/// with whatever output that run produced, including partial output from a
/// timed out run.
#[derive(Debug, Clone, Default)]
pub struct LogStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, job: &str, log: String) {
        self.inner.write().await.insert(job.to_string(), log);
    }

    /// Forget a job's previous log so a failed run never reports it.
    pub async fn clear(&self, job: &str) {
        self.inner.write().await.remove(job);
    }

    pub async fn get(&self, job: &JobSpec) -> Result<String> {
        self.inner
            .read()
            .await
            .get(&job.name)
            .cloned()
            .ok_or_else(|| Error::Logs {
                job: job.name.clone(),
                message: "job has not been run".to_string(),
            })
    }
}

/// Keep the last `max_lines` lines of a failing job's output for its error message.
pub(crate) fn tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
