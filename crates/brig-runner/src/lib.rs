//! Job execution for the brig pipeline.
//!
//! [`ContainerRunner`] runs jobs in Docker containers, which is how the
//! pipeline runs in production. [`ShellRunner`] runs the same task scripts
//! on the host for local development.

pub mod container;
pub mod runner;
pub mod shell;

pub use container::ContainerRunner;
pub use runner::{LogStore, RunnerConfig};
pub use shell::ShellRunner;
