//! Container-based job execution using Docker.

use crate::runner::{LogStore, RunnerConfig, tail};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use brig_core::{Error, JobOutcome, JobRunner, JobSpec, Result};
use futures::StreamExt;
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};

/// Runs each job in a fresh Docker container.
pub struct ContainerRunner {
    docker: Docker,
    config: RunnerConfig,
    logs: LogStore,
}

impl ContainerRunner {
    /// Connect to the local Docker daemon.
    pub fn new(config: RunnerConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Internal(format!("Failed to connect to Docker: {}", e)))?;

        Ok(Self::with_docker(docker, config))
    }

    /// Create with an existing Docker client.
    pub fn with_docker(docker: Docker, config: RunnerConfig) -> Self {
        Self {
            docker,
            config,
            logs: LogStore::new(),
        }
    }

    fn container_name(&self, job: &JobSpec) -> String {
        let prefix = self.config.name_prefix.as_deref().unwrap_or("brig");
        format!("{}-{}-{}", prefix, job.name, uuid::Uuid::new_v4().simple())
    }

    async fn ensure_image(&self, job: &JobSpec) -> Result<()> {
        if !job.image_force_pull && self.docker.inspect_image(&job.image).await.is_ok() {
            return Ok(());
        }

        info!(image = %job.image, force = job.image_force_pull, "Pulling image");
        let options = CreateImageOptions {
            from_image: job.image.clone(),
            ..Default::default()
        };
        let mut pull = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = pull.next().await {
            progress.map_err(|e| submission_error(job, "pull image", e))?;
        }
        Ok(())
    }

    async fn execute(&self, job: &JobSpec, container_name: &str) -> Result<(i64, String)> {
        let container_config = container_config(job);

        let create_options = CreateContainerOptions {
            name: container_name,
            platform: None,
        };

        self.docker
            .create_container(Some(create_options), container_config)
            .await
            .map_err(|e| submission_error(job, "create container", e))?;

        self.docker
            .start_container(container_name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| submission_error(job, "start container", e))?;

        let log_options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut output = String::new();
        let follow = async {
            let mut log_stream = self.docker.logs(container_name, Some(log_options));
            while let Some(log_result) = log_stream.next().await {
                match log_result {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                        output.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(job = %job.name, error = %e, "Error reading container logs");
                        break;
                    }
                }
            }

            let wait_options = WaitContainerOptions {
                condition: "not-running",
            };
            self.docker
                .wait_container(container_name, Some(wait_options))
                .next()
                .await
        };

        let wait_result = match self.config.timeout_seconds {
            Some(timeout_secs) => match timeout(Duration::from_secs(timeout_secs), follow).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(job = %job.name, timeout_secs, "Job timed out");
                    let _ = self
                        .docker
                        .kill_container::<String>(container_name, None)
                        .await;
                    self.logs.put(&job.name, output).await;
                    return Err(Error::JobFailed {
                        job: job.name.clone(),
                        exit_code: -1,
                        message: format!("timed out after {}s", timeout_secs),
                    });
                }
            },
            None => follow.await,
        };

        let exit_code = match wait_result {
            Some(Ok(response)) => response.status_code,
            // bollard reports non-zero exits as an error carrying the code
            Some(Err(DockerError::DockerContainerWaitError { code, .. })) => code,
            other => {
                self.logs.put(&job.name, output).await;
                return Err(match other {
                    Some(Err(e)) => submission_error(job, "wait for container", e),
                    _ => Error::JobSubmission {
                        job: job.name.clone(),
                        message: "container wait returned no result".to_string(),
                    },
                });
            }
        };

        Ok((exit_code, output))
    }

    async fn remove(&self, container_name: &str) {
        let remove_options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        if let Err(e) = self
            .docker
            .remove_container(container_name, Some(remove_options))
            .await
        {
            warn!(container = %container_name, error = %e, "Failed to remove container");
        }
    }
}

/// Container settings for a job. A job without tasks runs the image's own
/// command.
fn container_config(job: &JobSpec) -> Config<String> {
    let env: Vec<String> = job.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    let cmd = if job.tasks.is_empty() {
        None
    } else {
        Some(vec!["sh".to_string(), "-c".to_string(), job.script()])
    };

    Config {
        image: Some(job.image.clone()),
        cmd,
        env: Some(env),
        working_dir: job.mount_path.clone(),
        host_config: Some(bollard::models::HostConfig {
            privileged: Some(job.privileged),
            auto_remove: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn submission_error(job: &JobSpec, action: &str, err: DockerError) -> Error {
    Error::JobSubmission {
        job: job.name.clone(),
        message: format!("failed to {}: {}", action, err),
    }
}

#[async_trait]
impl JobRunner for ContainerRunner {
    async fn run(&self, job: &JobSpec) -> Result<JobOutcome> {
        let start = std::time::Instant::now();
        let container_name = self.container_name(job);

        info!(
            job = %job.name,
            image = %job.image,
            container = %container_name,
            privileged = job.privileged,
            "Starting job"
        );
        self.logs.clear(&job.name).await;

        self.ensure_image(job).await?;
        let result = self.execute(job, &container_name).await;
        self.remove(&container_name).await;
        let (exit_code, output) = result?;

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

    #[test]
    fn test_tasks_run_as_shell_script() {
        let job = JobSpec::new("tests", "golang:1.22")
            .mount_path("/src")
            .env("SKIP_DOCKER", "true")
            .privileged(true)
            .task("make test");

        let config = container_config(&job);
        assert_eq!(
            config.cmd,
            Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                "make test || exit $?".to_string()
            ])
        );
        assert_eq!(config.env, Some(vec!["SKIP_DOCKER=true".to_string()]));
        assert_eq!(config.working_dir.as_deref(), Some("/src"));
        assert_eq!(config.host_config.and_then(|h| h.privileged), Some(true));
    }

    #[test]
    fn test_job_without_tasks_keeps_image_command() {
        let job = JobSpec::new("tests-notification-1", "brigadecore/brigade-github-check-run")
            .env("CHECK_NAME", "tests");

        let config = container_config(&job);
        assert_eq!(config.cmd, None);
        assert_eq!(config.env, Some(vec!["CHECK_NAME=tests".to_string()]));
    }
}
