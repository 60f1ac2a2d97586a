use std::sync::Once;

use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::{EnvFilter, prelude::*};

static INIT: Once = Once::new();

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. `RUST_LOG` wins over `log_level`.
/// Later calls are no-ops.
pub fn init_logging(log_level: &str) {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(build_filter(log_level))
            .with(tracing_fmt::layer().with_writer(std::io::stderr))
            .try_init();
    });
}
