// src/engine/dispatch.rs

//! Carry out a [`BatchPlan`](super::BatchPlan).
//!
//! Order for a hard reload:
//! 1. `rebuilding` notice (unless every rule opted out);
//! 2. stop the app, concurrently with step 3 when several paths changed;
//! 3. per path, callbacks around the default actions;
//! 4. start the app, wait for readiness, send `other`.
//!
//! A hot batch runs step 3 only and then sends its style or reload messages.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::callbacks::run_for_path;
use crate::errors::{DevloopError, Result};
use crate::livereload::{must_reload_broadcast, ReloadMessage};
use crate::watch::EventBatch;

use super::context::DevContext;
use super::core::{plan_batch, DefaultAction, HotMessage};
use super::BatchOutcome;

type SharedOutcome = OnceCell<std::result::Result<(), String>>;

/// Each default action runs at most once per batch; later paths asking for
/// the same action share the first outcome.
#[derive(Debug, Default)]
struct OnceActions {
    recompile: SharedOutcome,
    assets: SharedOutcome,
    stylesheets: SharedOutcome,
}

pub async fn dispatch_batch(ctx: &DevContext, batch: &EventBatch) -> Result<BatchOutcome> {
    let classified = ctx.classifier.classify(batch);
    if classified.is_empty() {
        debug!(events = batch.len(), "nothing relevant in batch");
        return Ok(BatchOutcome::Ignored);
    }

    let plan = plan_batch(&ctx.classifier, &classified);
    info!(
        paths = plan.steps.len(),
        hard_reload = plan.hard_reload,
        "processing changes"
    );

    if plan.send_rebuilding {
        ctx.broadcaster.broadcast(ReloadMessage::rebuilding());
    }

    let early_kill = plan.kill_early.then(|| {
        let process = Arc::clone(&ctx.process);
        tokio::spawn(async move { process.stop().await })
    });

    let once = OnceActions::default();
    let mut result = Ok(());
    for step in &plan.steps {
        let (callbacks, run_only) = match ctx.classifier.rule(step.rule) {
            Some(rule) => (rule.callbacks.as_slice(), rule.run_callbacks_only),
            None => (&[][..], false),
        };

        let outcome = run_for_path(callbacks, run_only, &step.path, &ctx.matcher, || async {
            for action in &step.actions {
                run_default(ctx, &once, *action).await?;
            }
            Ok(())
        })
        .await;

        if let Err(err) = outcome {
            error!(path = %step.path, error = %err, "change processing failed");
            result = Err(err);
            break;
        }
    }

    if plan.hard_reload {
        let killed = match early_kill {
            Some(handle) => Some(match handle.await {
                Ok(res) => res,
                Err(e) => Err(DevloopError::Process(format!("stop task failed: {e}"))),
            }),
            None => None,
        };

        if let Err(err) = result {
            if killed.is_some() {
                warn!("rebuild failed after the app was stopped; restarting the previous build");
                if let Err(e) = ctx.process.start().await {
                    error!(error = %e, "failed to restart previous build");
                }
            }
            return Err(err);
        }

        match killed {
            Some(res) => res?,
            None => ctx.process.stop().await?,
        }
        ctx.process.start().await?;
        must_reload_broadcast(&*ctx.process, &ctx.broadcaster, ReloadMessage::reload()).await?;
        return Ok(BatchOutcome::Restarted);
    }

    result?;

    for msg in &plan.messages {
        let msg = match msg {
            HotMessage::Reload => ReloadMessage::reload(),
            HotMessage::Revalidate => ReloadMessage::revalidate(),
            HotMessage::Critical => ReloadMessage::critical(&ctx.pipeline.critical_css()?),
            HotMessage::Normal => match ctx.pipeline.normal_css_url()? {
                Some(url) => ReloadMessage::normal(url),
                None => continue,
            },
        };
        must_reload_broadcast(&*ctx.process, &ctx.broadcaster, msg).await?;
    }

    Ok(BatchOutcome::HotReloaded)
}

async fn run_default(ctx: &DevContext, once: &OnceActions, action: DefaultAction) -> Result<()> {
    let shared = match action {
        DefaultAction::Recompile => {
            once.recompile
                .get_or_init(|| async { flatten(ctx.process.recompile().await) })
                .await
        }
        DefaultAction::BuildAssets => {
            once.assets
                .get_or_init(|| async { flatten(ctx.pipeline.build_all(true).await.map(|_| ())) })
                .await
        }
        DefaultAction::BuildStylesheets => {
            once.stylesheets
                .get_or_init(|| async {
                    flatten(ctx.pipeline.rebuild_stylesheets().await.map(|_| ()))
                })
                .await
        }
    };
    shared.clone().map_err(DevloopError::Build)
}

fn flatten(res: Result<()>) -> std::result::Result<(), String> {
    res.map_err(|e| e.to_build_message())
}
