use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devloop::errors::DevloopError;
use devloop::process::{AppProcess, ProcessFuture};

/// A fake app process that:
/// - records every lifecycle call in order
/// - can be told to fail the next recompiles or to never become ready
/// - can delay `stop` to make overlapping work observable.
#[derive(Debug, Clone, Default)]
pub struct FakeProcess {
    calls: Arc<Mutex<Vec<&'static str>>>,
    fail_recompile: Arc<AtomicBool>,
    never_ready: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    recompiles: Arc<AtomicU32>,
    stop_delay: Arc<Mutex<Option<Duration>>>,
}

impl FakeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn recompiles(&self) -> u32 {
        self.recompiles.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_fail_recompile(&self, fail: bool) {
        self.fail_recompile.store(fail, Ordering::SeqCst);
    }

    pub fn set_never_ready(&self, never: bool) {
        self.never_ready.store(never, Ordering::SeqCst);
    }

    pub fn set_stop_delay(&self, delay: Duration) {
        *self.stop_delay.lock().unwrap() = Some(delay);
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl AppProcess for FakeProcess {
    fn recompile(&self) -> ProcessFuture<'_> {
        Box::pin(async move {
            self.record("recompile");
            self.recompiles.fetch_add(1, Ordering::SeqCst);
            if self.fail_recompile.load(Ordering::SeqCst) {
                return Err(DevloopError::Build("fake compile error".to_string()));
            }
            Ok(())
        })
    }

    fn start(&self) -> ProcessFuture<'_> {
        Box::pin(async move {
            self.record("start");
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn stop(&self) -> ProcessFuture<'_> {
        Box::pin(async move {
            let delay = *self.stop_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.record("stop");
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn wait_for_readiness(&self) -> ProcessFuture<'_> {
        Box::pin(async move {
            self.record("ready");
            if self.never_ready.load(Ordering::SeqCst) || !self.is_running() {
                return Err(DevloopError::Readiness {
                    url: "http://127.0.0.1/fake".to_string(),
                    attempts: 1,
                });
            }
            Ok(())
        })
    }
}
