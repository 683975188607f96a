//! Error types for brig.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Event errors
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    // Job errors
    #[error("Job {job} failed with exit code {exit_code}: {message}")]
    JobFailed {
        job: String,
        exit_code: i64,
        message: String,
    },

    #[error("Job submission failed for {job}: {message}")]
    JobSubmission { job: String, message: String },

    #[error("Logs unavailable for {job}: {message}")]
    Logs { job: String, message: String },

    // Notification wrapping
    #[error("Notification {name} could not be sent: {message}")]
    NotifyFailed { name: String, message: String },

    #[error("Task \"{job}\" failed: {source}")]
    WorkFailed {
        job: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Work failed ({work}) and the failure notification was lost ({notify})")]
    DoubleFailure { work: Box<Error>, notify: Box<Error> },

    // Infrastructure errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Wrap a job failure so it names the task it came from.
    pub fn work_failed(job: impl Into<String>, source: Error) -> Self {
        Error::WorkFailed {
            job: job.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error originated from a notification send.
    pub fn is_notify_failure(&self) -> bool {
        matches!(self, Error::NotifyFailed { .. })
    }
}
