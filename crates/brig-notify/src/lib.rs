//! Check-run notifications for the brig pipeline.
//!
//! Provides the notification wrapper that brackets a job between a
//! "running" and a "success/failure" check-run update, plus the two
//! transports those updates travel over: a job running the check-run
//! image, or a direct call to the GitHub Checks API.

pub mod check;
pub mod github;
pub mod sender;
pub mod wrap;

pub use check::{
    CheckAction, CheckOutput, CheckPayload, CheckRun, CheckRunRequest, CheckStatus, RepoTarget,
};
pub use github::{GitHubCheckClient, GitHubNotifier};
pub use sender::{DEFAULT_CHECK_RUN_IMAGE, JobNotifier, NotifyError};
pub use wrap::{WrapOutcome, wrap};
