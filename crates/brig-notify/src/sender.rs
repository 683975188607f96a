//! Notification errors and the job-shaped notifier.

use async_trait::async_trait;
use brig_core::{Error, JobRunner, JobSpec, NotificationSend, Notifier, NotifyAck, Result};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Image that turns CHECK_* variables into a GitHub check run.
pub const DEFAULT_CHECK_RUN_IMAGE: &str = "brigadecore/brigade-github-check-run:latest";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid check request: {0}")]
    InvalidRequest(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

impl NotifyError {
    /// Convert into the pipeline error for the named notification.
    pub fn into_pipeline_error(self, name: &str) -> Error {
        Error::NotifyFailed {
            name: name.to_string(),
            message: self.to_string(),
        }
    }
}

/// Sends notifications by running the check-run image as a job.
///
/// Each send becomes its own job, named after the send's sequence number, so
/// repeated sends never collide on the platform.
pub struct JobNotifier<R: JobRunner + ?Sized> {
    runner: Arc<R>,
    image: String,
}

impl<R: JobRunner + ?Sized> JobNotifier<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self::with_image(runner, DEFAULT_CHECK_RUN_IMAGE)
    }

    pub fn with_image(runner: Arc<R>, image: impl Into<String>) -> Self {
        Self {
            runner,
            image: image.into(),
        }
    }

    /// The job a send is delivered by.
    pub fn job_for(&self, send: &NotificationSend) -> JobSpec {
        JobSpec::new(&send.job_name, &self.image)
            .force_pull(true)
            .envs(send.env.clone())
    }
}

#[async_trait]
impl<R: JobRunner + ?Sized> Notifier for JobNotifier<R> {
    async fn send(&self, notification: &NotificationSend) -> Result<NotifyAck> {
        let job = self.job_for(notification);
        debug!(
            job = %job.name,
            conclusion = ?notification.conclusion,
            "Sending check-run notification"
        );

        let outcome = self.runner.run(&job).await.map_err(|e| Error::NotifyFailed {
            name: job.name.clone(),
            message: e.to_string(),
        })?;

        info!(job = %job.name, "Check-run notification sent");
        Ok(NotifyAck {
            id: job.name,
            response: outcome.output,
        })
    }
}
