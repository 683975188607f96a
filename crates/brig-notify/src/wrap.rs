//! Bracketing a job between two check-run notifications.

use crate::check::{MAX_OUTPUT_CHARS, truncate_tail};
use brig_core::{
    Conclusion, Error, JobRunner, JobSpec, Notification, Notifier, NotifyAck, Result,
};
use tracing::{error, info, warn};

/// How a wrapped job ended, when the outcome could be reported or the
/// report itself was lost.
#[derive(Debug)]
pub enum WrapOutcome {
    /// The job passed and the success notification was delivered.
    Passed(NotifyAck),
    /// The job failed and so did the failure notification. Both errors are
    /// kept; neither is reported over the other.
    DoubleFailure { work: Error, notify: Error },
}

impl WrapOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WrapOutcome::Passed(_))
    }

    /// Collapse into a result, turning a double failure into an error.
    pub fn into_result(self) -> Result<NotifyAck> {
        match self {
            WrapOutcome::Passed(ack) => Ok(ack),
            WrapOutcome::DoubleFailure { work, notify } => Err(Error::DoubleFailure {
                work: Box::new(work),
                notify: Box::new(notify),
            }),
        }
    }
}

/// Wrap `text` in a code fence followed by `suffix`, keeping the tail of
/// `text` so the whole fits in a check-run body.
fn fenced(text: &str, suffix: &str) -> String {
    let overhead = "``````\n".len() + suffix.chars().count();
    let budget = MAX_OUTPUT_CHARS.saturating_sub(overhead);
    format!("```{}```\n{}", truncate_tail(text, budget), suffix)
}

/// Run `job` between a "running" and a "success/failure" notification.
///
/// The initial notification is sent before anything else; if it fails the
/// job is never run. After the job settles exactly one more notification is
/// sent. When that final send fails for a job that also failed, both errors
/// are logged and `Ok(WrapOutcome::DoubleFailure)` is returned, so callers
/// must check [`WrapOutcome::is_success`] rather than treat `Ok` as a pass.
pub async fn wrap(
    runner: &dyn JobRunner,
    notifier: &dyn Notifier,
    job: &JobSpec,
    note: &mut Notification,
) -> Result<WrapOutcome> {
    notifier.send(&note.next_send()).await?;

    match runner.run(job).await {
        Ok(outcome) => {
            let log = match runner.logs(job).await {
                Ok(log) => log,
                Err(e) => {
                    warn!(job = %job.name, error = %e, "Failed to fetch logs, using job output");
                    outcome.output.clone()
                }
            };

            note.conclusion = Some(Conclusion::Success);
            note.summary = format!("Task \"{}\" passed", job.name);
            note.text = fenced(&log, "Test Complete");

            let ack = notifier.send(&note.next_send()).await?;
            info!(job = %job.name, "Task passed");
            Ok(WrapOutcome::Passed(ack))
        }
        Err(work_err) => {
            let log = runner.logs(job).await.unwrap_or_else(|e| {
                warn!(job = %job.name, error = %e, "Failed to fetch logs");
                "(logs unavailable)".to_string()
            });

            note.conclusion = Some(Conclusion::Failure);
            note.summary = format!("Task \"{}\" failed for {}", job.name, note.external_id);
            note.text = fenced(&log, &format!("Failed with error: {}", work_err));

            match notifier.send(&note.next_send()).await {
                Ok(_) => Err(Error::work_failed(&job.name, work_err)),
                Err(notify_err) => {
                    error!(error = %notify_err, "failed to send notification");
                    error!(error = %work_err, "original error");
                    Ok(WrapOutcome::DoubleFailure {
                        work: work_err,
                        notify: notify_err,
                    })
                }
            }
        }
    }
}
