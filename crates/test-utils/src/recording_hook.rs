use std::sync::{Arc, Mutex};
use std::time::Duration;

use devloop::callbacks::{ChangeHook, HookFuture};
use devloop::errors::DevloopError;

/// Shared, ordered log of `"<label>:start"` / `"<label>:end"` entries.
pub type HookLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> HookLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A hook that writes to a shared log instead of running anything.
#[derive(Debug, Clone)]
pub struct RecordingHook {
    label: String,
    log: HookLog,
    delay: Option<Duration>,
    fail: bool,
}

impl RecordingHook {
    pub fn new(label: &str, log: HookLog) -> Self {
        Self {
            label: label.to_string(),
            log,
            delay: None,
            fail: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl ChangeHook for RecordingHook {
    fn run<'a>(&'a self, path: &'a str) -> HookFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("{}:start", self.label));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.log.lock().unwrap().push(format!("{}:end", self.label));
            if self.fail {
                return Err(DevloopError::Callback {
                    path: path.to_string(),
                    message: format!("{} failed", self.label),
                });
            }
            Ok(())
        })
    }
}
