//! brig core
//!
//! Domain types, port traits and error handling shared by the dispatcher,
//! the runners and the notifiers. This crate has minimal dependencies and
//! defines the vocabulary used across all other crates.

pub mod error;
pub mod event;
pub mod job;
pub mod notification;
pub mod ports;
pub mod project;

pub use error::{Error, Result};
pub use event::{Event, EventKind, Revision};
pub use job::{JobOutcome, JobSpec};
pub use notification::{Conclusion, Notification, NotificationSend};
pub use ports::{JobRunner, Notifier, NotifyAck};
pub use project::{Project, ProjectSecrets};
