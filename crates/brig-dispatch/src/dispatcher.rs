//! Explicit event handler registration and dispatch.

use crate::handlers::{CheckHandler, ExecHandler, PushHandler};
use crate::triggers::RefMatcher;
use async_trait::async_trait;
use brig_core::{Event, EventKind, JobOutcome, JobRunner, Notifier, Project, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Images and refs the pipeline is built around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Branch whose pushes publish edge images. Full ref or bare name.
    #[serde(default = "default_main_branch")]
    pub main_branch: String,
    #[serde(default = "default_test_image")]
    pub test_image: String,
    #[serde(default = "default_build_image")]
    pub build_image: String,
    #[serde(default = "default_go_path")]
    pub go_path: String,
}

fn default_main_branch() -> String {
    "refs/heads/master".to_string()
}

fn default_test_image() -> String {
    "quay.io/deis/lightweight-docker-go:v0.6.0".to_string()
}

fn default_build_image() -> String {
    "docker:stable-dind".to_string()
}

fn default_go_path() -> String {
    "/go".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            main_branch: default_main_branch(),
            test_image: default_test_image(),
            build_image: default_build_image(),
            go_path: default_go_path(),
        }
    }
}

/// Everything a handler needs besides the event itself.
#[derive(Clone)]
pub struct PipelineContext {
    pub project: Project,
    pub config: PipelineConfig,
    pub runner: Arc<dyn JobRunner>,
    pub notifier: Arc<dyn Notifier>,
}

impl PipelineContext {
    pub fn new(
        project: Project,
        config: PipelineConfig,
        runner: Arc<dyn JobRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            project,
            config,
            runner,
            notifier,
        }
    }

    pub fn refs(&self) -> RefMatcher {
        RefMatcher::new(&self.config.main_branch)
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("project", &self.project)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Pipeline stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Tests,
    BuildAndPublish,
    Check,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Tests => "tests",
            Stage::BuildAndPublish => "build-and-publish-images",
            Stage::Check => "check",
        })
    }
}

/// What a dispatch scheduled and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was scheduled for this event.
    Skipped { reason: String },
    /// The plain test job ran.
    Tested(JobOutcome),
    /// Release images were built for a version tag.
    Released { version: String },
    /// Tests passed and edge images were built.
    EdgeReleased,
    /// The wrapped test check passed and was reported.
    Checked { check_id: String },
    /// A stage failed; the failure was logged and not propagated.
    Failed { stage: Stage, error: String },
}

impl DispatchOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        DispatchOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchOutcome::Failed { .. })
    }
}

/// Reacts to one kind of event.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, event: &Event, ctx: &PipelineContext) -> Result<DispatchOutcome>;
}

/// Routes events to the handlers registered for their kind.
pub struct Dispatcher {
    ctx: PipelineContext,
    handlers: HashMap<EventKind, Arc<dyn Handler>>,
}

impl Dispatcher {
    pub fn builder(ctx: PipelineContext) -> DispatcherBuilder {
        DispatcherBuilder {
            ctx,
            handlers: HashMap::new(),
        }
    }

    /// The standard pipeline: tests on `exec`, releases on `push`, and
    /// wrapped tests on check-suite and check-run requests.
    pub fn standard(ctx: PipelineContext) -> Self {
        let check: Arc<dyn Handler> = Arc::new(CheckHandler);
        Self::builder(ctx)
            .on(EventKind::Exec, ExecHandler)
            .on(EventKind::Push, PushHandler)
            .on_shared(EventKind::CheckSuiteRequested, check.clone())
            .on_shared(EventKind::CheckSuiteRerequested, check.clone())
            .on_shared(EventKind::CheckRunRerequested, check)
            .build()
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn handles(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Dispatch one event. Events without a handler are skipped.
    pub async fn dispatch(&self, event: &Event) -> Result<DispatchOutcome> {
        let Some(handler) = self.handlers.get(&event.kind) else {
            debug!(event = %event.kind, "No handler registered");
            return Ok(DispatchOutcome::skipped(format!(
                "no handler for {}",
                event.kind
            )));
        };

        info!(
            event = %event.kind,
            git_ref = %event.git_ref(),
            build_id = %event.build_id,
            "Dispatching event"
        );
        handler.handle(event, &self.ctx).await
    }
}

pub struct DispatcherBuilder {
    ctx: PipelineContext,
    handlers: HashMap<EventKind, Arc<dyn Handler>>,
}

impl DispatcherBuilder {
    /// Register `handler` for `kind`, replacing any earlier registration.
    pub fn on(self, kind: EventKind, handler: impl Handler + 'static) -> Self {
        self.on_shared(kind, Arc::new(handler))
    }

    pub fn on_shared(mut self, kind: EventKind, handler: Arc<dyn Handler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            ctx: self.ctx,
            handlers: self.handlers,
        }
    }
}
