//! Job specifications handed to a [`JobRunner`](crate::ports::JobRunner).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A unit of work to run in a container on the host platform.
///
/// Jobs are built fresh for every invocation and owned by the runner once
/// submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub image: String,
    /// Working directory the sources are mounted at.
    #[serde(default)]
    pub mount_path: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Shell commands, run in order.
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub image_force_pull: bool,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            mount_path: None,
            env: BTreeMap::new(),
            tasks: Vec::new(),
            privileged: false,
            image_force_pull: false,
        }
    }

    pub fn mount_path(mut self, path: impl Into<String>) -> Self {
        self.mount_path = Some(path.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn task(mut self, command: impl Into<String>) -> Self {
        self.tasks.push(command.into());
        self
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn force_pull(mut self, force: bool) -> Self {
        self.image_force_pull = force;
        self
    }

    /// The task list as a single `sh -c` script. Stops at the first failing
    /// command, except for commands explicitly backgrounded with `&`.
    pub fn script(&self) -> String {
        let mut script = String::new();
        for task in &self.tasks {
            let task = task.trim();
            if task.is_empty() {
                continue;
            }
            if !script.is_empty() {
                script.push('\n');
            }
            if task.ends_with('&') {
                script.push_str(task);
            } else {
                script.push_str(task);
                script.push_str(" || exit $?");
            }
        }
        script
    }
}

/// Result of a job that ran to completion with a zero exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job: String,
    pub exit_code: i64,
    /// Combined stdout/stderr of the job.
    pub output: String,
    pub duration_ms: u64,
}
