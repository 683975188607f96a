//! The standard event handlers.

use crate::dispatcher::{DispatchOutcome, Handler, PipelineContext, Stage};
use crate::jobs;
use crate::triggers::RefKind;
use async_trait::async_trait;
use brig_core::{Event, Result};
use brig_notify::{WrapOutcome, wrap};
use tracing::{error, info};

/// `exec`: run the tests and hand back their result.
pub struct ExecHandler;

#[async_trait]
impl Handler for ExecHandler {
    async fn handle(&self, _event: &Event, ctx: &PipelineContext) -> Result<DispatchOutcome> {
        let job = jobs::test_job(&ctx.project, &ctx.config);
        let outcome = ctx.runner.run(&job).await?;
        Ok(DispatchOutcome::Tested(outcome))
    }
}

/// `push`: release images for version tags, edge images for the main branch.
///
/// Failures are logged and reported in the outcome, never returned as errors.
pub struct PushHandler;

impl PushHandler {
    async fn build_and_publish(&self, ctx: &PipelineContext, version: &str) -> Result<()> {
        let job = jobs::build_and_publish_job(&ctx.project, &ctx.config, version);
        ctx.runner.run(&job).await.map(|_| ())
    }
}

#[async_trait]
impl Handler for PushHandler {
    async fn handle(&self, event: &Event, ctx: &PipelineContext) -> Result<DispatchOutcome> {
        let refs = ctx.refs();

        match refs.classify(event.git_ref()) {
            RefKind::Release { version } => {
                info!(version, "Building release images");
                match self.build_and_publish(ctx, version).await {
                    Ok(()) => Ok(DispatchOutcome::Released {
                        version: version.to_string(),
                    }),
                    Err(e) => {
                        error!(version, error = %e, "Release build failed");
                        Ok(DispatchOutcome::Failed {
                            stage: Stage::BuildAndPublish,
                            error: e.to_string(),
                        })
                    }
                }
            }
            RefKind::MainBranch => {
                let tests = jobs::test_job(&ctx.project, &ctx.config);
                if let Err(e) = ctx.runner.run(&tests).await {
                    error!(error = %e, "Tests failed, not publishing edge images");
                    return Ok(DispatchOutcome::Failed {
                        stage: Stage::Tests,
                        error: e.to_string(),
                    });
                }

                info!("Tests passed, building edge images");
                match self.build_and_publish(ctx, "").await {
                    Ok(()) => Ok(DispatchOutcome::EdgeReleased),
                    Err(e) => {
                        error!(error = %e, "Edge build failed");
                        Ok(DispatchOutcome::Failed {
                            stage: Stage::BuildAndPublish,
                            error: e.to_string(),
                        })
                    }
                }
            }
            RefKind::Other => Ok(DispatchOutcome::skipped(format!(
                "nothing to build for {}",
                event.git_ref()
            ))),
        }
    }
}

/// Check-suite and check-run requests: run the tests as a reported check.
///
/// The main branch is skipped because its pushes already run the tests
/// before publishing.
pub struct CheckHandler;

#[async_trait]
impl Handler for CheckHandler {
    async fn handle(&self, event: &Event, ctx: &PipelineContext) -> Result<DispatchOutcome> {
        if ctx.refs().is_main_branch(event.git_ref()) {
            return Ok(DispatchOutcome::skipped(
                "main branch is tested by its push",
            ));
        }

        info!(git_ref = %event.git_ref(), "Check requested");
        let job = jobs::test_job(&ctx.project, &ctx.config);
        let mut note = jobs::test_check(event, &ctx.project);

        let result = wrap(ctx.runner.as_ref(), ctx.notifier.as_ref(), &job, &mut note).await;
        match result.and_then(WrapOutcome::into_result) {
            Ok(ack) => Ok(DispatchOutcome::Checked { check_id: ack.id }),
            Err(e) => {
                error!(error = %e, "Check failed");
                Ok(DispatchOutcome::Failed {
                    stage: Stage::Check,
                    error: e.to_string(),
                })
            }
        }
    }
}
