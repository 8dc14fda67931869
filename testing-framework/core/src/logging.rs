use std::sync::Once;

use tracing_subscriber::EnvFilter;

const DEFAULT_TEST_FILTER: &str = "warn,babylon_e2e=info";

static INIT: Once = Once::new();

/// Installs a compact fmt subscriber writing through the test harness.
///
/// `RUST_LOG` overrides the default filter. Safe to call from every test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(build_test_filter())
            .compact()
            .with_test_writer()
            .try_init();
    });
}

fn build_test_filter() -> EnvFilter {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_TEST_FILTER))
}
