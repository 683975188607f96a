//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the pipeline logic and the
//! platform that actually runs jobs and delivers check-run updates.

use crate::Result;
use crate::job::{JobOutcome, JobSpec};
use crate::notification::NotificationSend;
use async_trait::async_trait;

/// Runs jobs on the execution platform.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Submit a job and wait for it to finish.
    ///
    /// A job that exits non-zero is an error.
    async fn run(&self, job: &JobSpec) -> Result<JobOutcome>;

    /// Fetch the output log of a job that has been run.
    async fn logs(&self, job: &JobSpec) -> Result<String>;
}

/// Acknowledgement of a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyAck {
    /// Job name or check-run id the transport assigned to the delivery.
    pub id: String,
    /// Raw response from the transport, if any.
    pub response: String,
}

/// Delivers check-run notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a notification snapshot.
    async fn send(&self, notification: &NotificationSend) -> Result<NotifyAck>;
}
