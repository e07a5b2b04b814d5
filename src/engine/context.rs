// src/engine/context.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::assets::AssetPipeline;
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::layout::Layout;
use crate::livereload::Broadcaster;
use crate::matcher::PatternMatcher;
use crate::process::AppProcess;
use crate::watch::{
    ignore_patterns, rules_from_config, Classifier, ClassifierDirs, WatchOptions, WatchRule,
};

/// Everything a session needs, created once at startup and shared by the
/// runtime loop. There is no other global state.
#[derive(Debug)]
pub struct DevContext {
    pub config: ConfigFile,
    pub layout: Arc<Layout>,
    pub fs: Arc<dyn FileSystem>,
    pub matcher: Arc<PatternMatcher>,
    pub classifier: Classifier,
    pub pipeline: AssetPipeline,
    pub process: Arc<dyn AppProcess>,
    pub broadcaster: Broadcaster,
}

impl DevContext {
    /// Wire up a context with the rules declared in `config`.
    pub fn new(
        config: ConfigFile,
        fs: Arc<dyn FileSystem>,
        process: Arc<dyn AppProcess>,
        broadcaster: Broadcaster,
    ) -> Self {
        let rules = rules_from_config(&config.watch.rule, config.root());
        Self::with_rules(config, fs, process, broadcaster, rules)
    }

    /// Like [`DevContext::new`] but with explicit rules (custom hooks).
    pub fn with_rules(
        config: ConfigFile,
        fs: Arc<dyn FileSystem>,
        process: Arc<dyn AppProcess>,
        broadcaster: Broadcaster,
        rules: Vec<WatchRule>,
    ) -> Self {
        let layout = Arc::new(Layout::from_config(&config));
        let matcher = Arc::new(PatternMatcher::new());
        let classifier = Classifier::new(
            rules,
            ignore_patterns(&layout.output_rel, &config.watch.ignore),
            ClassifierDirs::from_layout(&layout, &config.app.source_extensions),
            Arc::clone(&matcher),
        );
        let pipeline = AssetPipeline::new(Arc::clone(&fs), Arc::clone(&layout));

        Self {
            config,
            layout,
            fs,
            matcher,
            classifier,
            pipeline,
            process,
            broadcaster,
        }
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            root: self.layout.root.clone(),
            ignore: self.classifier.ignore_patterns().to_vec(),
            debounce: Duration::from_millis(self.config.watch.debounce_ms),
        }
    }

    /// Full asset build, then compile the app.
    pub async fn build(&self) -> Result<()> {
        self.pipeline.build_all(false).await?;
        self.process.recompile().await
    }

    /// Full build, compile, start, wait until the app answers.
    pub async fn startup(&self) -> Result<()> {
        self.build().await?;
        self.process.start().await?;
        self.process.wait_for_readiness().await?;
        info!(port = self.config.app.port, "app is up");
        Ok(())
    }
}
