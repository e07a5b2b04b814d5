// src/engine/core.rs

//! Pure planning: classified batch in, list of actions out.
//!
//! Keeping this free of IO means the decisions (hard vs hot reload, which
//! default action per path, which messages) can be tested without a process
//! or a filesystem.

use crate::watch::{ClassifiedBatch, Classifier, PathKind, RuleRef};

/// Built-in work done for a path, deduplicated per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultAction {
    Recompile,
    /// Granular rebuild of the whole static tree.
    BuildAssets,
    BuildStylesheets,
}

/// Browser instruction for a batch that did not restart the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotMessage {
    Reload,
    Critical,
    Normal,
    Revalidate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub path: String,
    pub rule: RuleRef,
    pub actions: Vec<DefaultAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    pub hard_reload: bool,
    pub send_rebuilding: bool,
    /// Stop the app while the paths are still being processed.
    pub kill_early: bool,
    pub steps: Vec<PathStep>,
    /// Sent, in order, after a hot batch.
    pub messages: Vec<HotMessage>,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

pub fn plan_batch(classifier: &Classifier, batch: &ClassifiedBatch) -> BatchPlan {
    let hard_reload = batch.needs_hard_reload;

    let steps: Vec<PathStep> = batch
        .paths
        .iter()
        .map(|p| {
            let mut actions = Vec::new();
            match p.kind {
                PathKind::Static(_) => actions.push(DefaultAction::BuildAssets),
                PathKind::CriticalCss | PathKind::NormalCss => {
                    actions.push(DefaultAction::BuildStylesheets)
                }
                PathKind::Source | PathKind::Other => {}
            }
            if classifier.needs_recompile(p) {
                actions.push(DefaultAction::Recompile);
            }
            PathStep {
                path: p.path.clone(),
                rule: p.rule,
                actions,
            }
        })
        .collect();

    let mut messages = Vec::new();
    if !hard_reload {
        let has = |pred: fn(PathKind) -> bool| batch.has_kind(pred);
        if has(|k| matches!(k, PathKind::Static(_))) {
            messages.push(HotMessage::Reload);
        } else {
            if has(|k| k == PathKind::CriticalCss) {
                messages.push(HotMessage::Critical);
            }
            if has(|k| k == PathKind::NormalCss) {
                messages.push(HotMessage::Normal);
            }
            if has(|k| matches!(k, PathKind::Other | PathKind::Source)) {
                messages.push(HotMessage::Revalidate);
            }
        }
    }

    BatchPlan {
        hard_reload,
        send_rebuilding: hard_reload && classifier.wants_rebuilding_notice(batch),
        kill_early: hard_reload && steps.len() > 1,
        steps,
        messages,
    }
}
