//! Event dispatch for the brig pipeline.
//!
//! Maps inbound events to jobs: tests on demand, tests followed by edge
//! images on the main branch, release images on version tags, and
//! notification-wrapped tests for check-suite requests.

pub mod dispatcher;
pub mod handlers;
pub mod jobs;
pub mod triggers;

pub use dispatcher::{
    DispatchOutcome, Dispatcher, DispatcherBuilder, Handler, PipelineConfig, PipelineContext,
    Stage,
};
pub use triggers::{RefKind, RefMatcher, release_version};
