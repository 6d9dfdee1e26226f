//! One-shot logger initialization.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the global `env_logger` once.
///
/// Filtering follows the usual `RUST_LOG` syntax (e.g. `info` or
/// `vantage3d=debug`). Subsequent calls are ignored, so embedders and tests
/// may both call this safely.
pub fn init_logging() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        if let Err(e) = builder.try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        }
    });
}
