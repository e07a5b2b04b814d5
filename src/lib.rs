// src/lib.rs

pub mod assets;
pub mod callbacks;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod layout;
pub mod livereload;
pub mod logging;
pub mod matcher;
pub mod process;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{DevContext, Runtime, RuntimeEvent};
use crate::fs::{FileSystem, RealFileSystem};
use crate::layout::Layout;
use crate::livereload::Broadcaster;
use crate::process::{Supervisor, SupervisorConfig};

/// High-level entry point used by `main.rs`.
///
/// Startup order: kill a leftover app, full asset build, compile, start the
/// app, serve live reload, then watch until Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let layout = Layout::from_config(&cfg);
    let supervisor = Arc::new(Supervisor::new(SupervisorConfig::from_config(&cfg, &layout)));
    if supervisor.kill_orphan().await? {
        info!("stopped app left running by a previous session");
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let (broadcaster, _coordinator) = Broadcaster::spawn();
    let ctx = Arc::new(DevContext::new(
        cfg,
        fs,
        supervisor.clone(),
        broadcaster.clone(),
    ));

    if args.once {
        ctx.build().await?;
        info!(executable = ?ctx.layout.executable, "build finished");
        return Ok(());
    }

    if let Err(err) = ctx.startup().await {
        error!(error = %err, "initial build failed; waiting for changes");
    }

    let listener = livereload::bind(ctx.config.livereload.port).await?;
    tokio::spawn(async move {
        if let Err(err) = livereload::serve(listener, broadcaster).await {
            error!(error = %err, "live-reload server stopped");
        }
    });

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);

    let _watcher_handle =
        watch::spawn_watcher(ctx.watch_options(), Arc::clone(&ctx.matcher), rt_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    Runtime::new(ctx, rt_rx).run().await?;
    Ok(())
}

/// Print the resolved configuration without doing anything.
fn print_dry_run(cfg: &ConfigFile) {
    let layout = Layout::from_config(cfg);

    println!("devloop dry-run");
    println!("  root = {}", layout.root.display());
    println!("  output = {}", layout.output_dir.display());
    println!("  executable = {}", layout.executable.display());
    println!("  public = {} (served at {})", layout.public_rel, layout.public_url_prefix);
    println!("  private = {}", layout.private_rel);
    println!("  critical css = {}", layout.critical_css_rel);
    println!("  normal css = {}", layout.normal_css_rel);
    println!(
        "  app: build `{}`, port {}, health {}",
        cfg.app.build_cmd,
        cfg.app.port,
        cfg.health_check_path()
    );
    println!("  livereload port = {}", cfg.livereload.port);
    println!("  debounce = {}ms", cfg.watch.debounce_ms);
    if !cfg.watch.ignore.is_empty() {
        println!("  ignore: {:?}", cfg.watch.ignore);
    }
    println!();

    println!("rules ({}):", cfg.watch.rule.len());
    for rule in &cfg.watch.rule {
        println!("  - {}", rule.pattern);
        let flags = [
            ("run_callbacks_only", rule.run_callbacks_only),
            ("skip_rebuilding_notice", rule.skip_rebuilding_notice),
            ("recompile_executable", rule.recompile_executable),
            ("restart_process", rule.restart_process),
            ("treat_source_as_opaque", rule.treat_source_as_opaque),
        ];
        for (name, set) in flags {
            if set {
                println!("      {name}: true");
            }
        }
        for cb in &rule.callback {
            println!("      callback [{}]: {}", cb.effective_strategy(), cb.cmd);
            if !cb.exclude.is_empty() {
                println!("        exclude: {:?}", cb.exclude);
            }
        }
    }

    debug!("dry-run complete (nothing built)");
}
