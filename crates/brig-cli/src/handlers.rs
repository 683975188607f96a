//! Command handlers.

use crate::config::{BrigConfig, NotifierMode};
use anyhow::Context;
use brig_core::{Event, JobRunner, Notifier};
use brig_dispatch::{DispatchOutcome, Dispatcher, PipelineContext};
use brig_notify::{CheckPayload, CheckRunRequest, GitHubCheckClient, GitHubNotifier, JobNotifier};
use brig_runner::{ContainerRunner, RunnerConfig, ShellRunner};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::info;

async fn read_event(path: &Path) -> anyhow::Result<Event> {
    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading event from {}", path.display()))?
    };
    Ok(Event::from_json(&json)?)
}

fn build_context(config: &BrigConfig, local: bool) -> anyhow::Result<PipelineContext> {
    let runner_config = RunnerConfig {
        timeout_seconds: config.runner.timeout_seconds,
        name_prefix: Some("brig".to_string()),
    };

    let runner: Arc<dyn JobRunner> = if local {
        Arc::new(ShellRunner::new(&config.runner.workspace, runner_config))
    } else {
        Arc::new(ContainerRunner::new(runner_config)?)
    };

    let notifier: Arc<dyn Notifier> = match config.notifier.mode {
        NotifierMode::Job => Arc::new(JobNotifier::with_image(
            runner.clone(),
            &config.notifier.check_run_image,
        )),
        NotifierMode::Api => Arc::new(GitHubNotifier::new(config.notifier.github_base_url.clone())),
    };

    Ok(PipelineContext::new(
        config.project.clone(),
        config.pipeline.clone(),
        runner,
        notifier,
    ))
}

/// Dispatch one event through the standard pipeline.
pub async fn dispatch(config: &BrigConfig, path: &Path, local: bool) -> anyhow::Result<()> {
    let event = read_event(path).await?;
    let dispatcher = Dispatcher::standard(build_context(config, local)?);

    let outcome = dispatcher.dispatch(&event).await?;
    info!(event = %event.kind, outcome = ?outcome, "Dispatch finished");

    match outcome {
        DispatchOutcome::Skipped { reason } => {
            println!("{} Skipped: {}", style("-").dim(), reason)
        }
        DispatchOutcome::Tested(result) => println!(
            "{} Tests passed in {}ms",
            style("✓").green(),
            result.duration_ms
        ),
        DispatchOutcome::Released { version } => {
            println!("{} Published images {}", style("✓").green(), style(version).bold())
        }
        DispatchOutcome::EdgeReleased => {
            println!("{} Published edge images", style("✓").green())
        }
        DispatchOutcome::Checked { check_id } => {
            println!("{} Check passed ({})", style("✓").green(), check_id)
        }
        DispatchOutcome::Failed { stage, error } => {
            println!("{} {} failed: {}", style("✗").red(), stage, error)
        }
    }
    Ok(())
}

/// A check-run failure and the exit code it maps to.
#[derive(Debug)]
pub struct CheckRunFailure {
    pub code: i32,
    pub message: String,
}

fn fail(code: i32, message: impl ToString) -> CheckRunFailure {
    CheckRunFailure {
        code,
        message: message.to_string(),
    }
}

/// Create a check run from CHECK_* variables, printing GitHub's response.
pub async fn check_run() -> Result<(), CheckRunFailure> {
    let request = CheckRunRequest::from_env().map_err(|e| fail(1, e))?;
    let response = create_check_run(&request).await?;
    println!("{}", response);
    Ok(())
}

/// Exit codes: 1 for bad input or delivery, 2 when the payload cannot be
/// processed, 3 when no client can be built.
async fn create_check_run(request: &CheckRunRequest) -> Result<String, CheckRunFailure> {
    let payload = CheckPayload::parse(&request.payload).map_err(|e| fail(1, e))?;
    payload
        .repo_commit_branch()
        .map_err(|e| fail(2, format!("Error processing data: {}", e)))?;
    let target = payload.target().map_err(|e| fail(1, e))?;

    let client = GitHubCheckClient::new(request.base_url.as_deref(), payload.token.clone())
        .map_err(|e| fail(3, e))?;
    client
        .create_run(&target, &request.check_run(&target))
        .await
        .map_err(|e| fail(1, e))
}

pub fn show_config(config: &BrigConfig) -> anyhow::Result<()> {
    print!("{}", config.redacted_yaml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(payload: &str) -> CheckRunRequest {
        let payload = payload.to_string();
        let lookup = |key: &str| (key == "CHECK_PAYLOAD").then(|| payload.clone());
        CheckRunRequest::from_lookup(lookup, None).unwrap()
    }

    async fn exit_code(payload: &str) -> i32 {
        create_check_run(&request(payload)).await.unwrap_err().code
    }

    #[tokio::test]
    async fn test_unparseable_payload_exits_1() {
        assert_eq!(exit_code("not json").await, 1);
    }

    #[tokio::test]
    async fn test_unknown_payload_type_exits_2() {
        let payload = r#"{"type": "pull_request", "token": "t", "body": {}}"#;
        assert_eq!(exit_code(payload).await, 2);
    }

    #[tokio::test]
    async fn test_missing_repository_exits_1() {
        let payload = r#"{
            "type": "check_suite",
            "token": "t",
            "body": {"check_suite": {"head_sha": "abc123", "head_branch": "feature-x"}}
        }"#;
        assert_eq!(exit_code(payload).await, 1);
    }

    #[tokio::test]
    async fn test_empty_token_exits_3() {
        let payload = r#"{
            "type": "check_suite",
            "token": "",
            "body": {
                "repository": {"full_name": "brigadecore/brigade-github-app"},
                "check_suite": {"head_sha": "abc123", "head_branch": "feature-x"}
            }
        }"#;
        assert_eq!(exit_code(payload).await, 3);
    }
}
