#![allow(dead_code)]
//! Shared integration test utilities.

use std::sync::Once;

use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED5EED;

const PROPTEST_SEED_ENV: &str = "WSFRAME_PROPTEST_SEED";

/// Installs a test-writer subscriber once per test binary.
///
/// The filter comes from `RUST_LOG` and defaults to `wsframe=trace`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wsframe=trace"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Proptest configuration with `cases` cases and a fixed seed on CI.
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    if let Some(seed) = read_proptest_seed() {
        config.rng_seed = RngSeed::Fixed(seed);
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    std::env::var("CI").ok().map(|_| DEFAULT_PROPTEST_SEED)
}
