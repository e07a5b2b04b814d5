// src/watch/debouncer.rs

use std::time::{Duration, Instant};

use super::event::{EventBatch, FileEvent};

/// Collects events into batches over a fixed window.
///
/// `Idle` until the first event arrives; the window is then measured from
/// that first event and is not extended by later ones. No IO happens here:
/// callers pass the current time in.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    started: Option<Instant>,
    pending: EventBatch,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            started: None,
            pending: EventBatch::new(),
        }
    }

    pub fn add(&mut self, event: FileEvent) {
        if self.started.is_none() {
            self.started = Some(event.at);
        }
        self.pending.insert(event);
    }

    pub fn is_idle(&self) -> bool {
        self.started.is_none()
    }

    /// When the current batch closes, if one is being collected.
    pub fn deadline(&self) -> Option<Instant> {
        self.started.map(|s| s + self.window)
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|d| now >= d)
    }

    /// Hand out the batch once the window has elapsed and go back to idle.
    pub fn take_if_ready(&mut self, now: Instant) -> Option<EventBatch> {
        if !self.is_ready(now) {
            return None;
        }
        self.started = None;
        Some(std::mem::take(&mut self.pending))
    }
}
