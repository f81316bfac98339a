//! Tracing setup
//!
//! Installs the tracing subscriber used by embedding applications.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with an env-filter.
///
/// Reads `RUST_LOG` when set, otherwise defaults to debug output for this
/// crate only. Safe to call once per process; later calls are ignored.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recmon=debug".into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
