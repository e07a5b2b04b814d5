//! Shared helpers for devloop's integration tests: config builders, a fake
//! app process, recording callbacks and tracing setup.

pub mod builders;
pub mod fake_process;
pub mod recording_hook;

use std::sync::Once;
use std::time::Duration;

use devloop::logging::filter_directives;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Per-test budget for [`with_timeout`].
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing for tests.
///
/// Output goes through `with_test_writer()`, so it only shows up for failing
/// tests (or with `-- --nocapture`). `RUST_LOG` overrides the default of
/// `info` with HTTP and watcher crates capped at `warn`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(filter_directives(tracing::Level::INFO, false))
        });

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future, failing the test if it takes longer than [`TEST_TIMEOUT`].
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {TEST_TIMEOUT:?}"))
}
