// src/engine/runtime.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::errors::Result;

use super::context::DevContext;
use super::dispatch::dispatch_batch;
use super::RuntimeEvent;

/// Consumes `RuntimeEvent`s and dispatches batches one at a time, so
/// builds never overlap. The watcher keeps collecting meanwhile.
#[derive(Debug)]
pub struct Runtime {
    ctx: Arc<DevContext>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
}

impl Runtime {
    pub fn new(ctx: Arc<DevContext>, event_rx: mpsc::Receiver<RuntimeEvent>) -> Self {
        Self { ctx, event_rx }
    }

    /// Main event loop. Stops the app on the way out.
    pub async fn run(mut self) -> Result<()> {
        info!("devloop runtime started");

        while let Some(event) = self.event_rx.recv().await {
            match event {
                RuntimeEvent::Batch(batch) => {
                    debug!(events = batch.len(), "runtime received batch");
                    match dispatch_batch(&self.ctx, &batch).await {
                        Ok(outcome) => debug!(?outcome, "batch done"),
                        Err(err) => error!(error = %err, "batch aborted"),
                    }
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        info!("runtime exiting; stopping app");
        self.ctx.process.stop().await
    }
}
