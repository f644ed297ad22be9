//! Console logging for both binaries.
//!
//! `RUST_LOG` picks the filter; without it everything at `info` and above is
//! printed.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(build_env_filter())
        .with(fmt::layer().with_target(false))
        .try_init()
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
