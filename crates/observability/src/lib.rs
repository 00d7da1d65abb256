//! Process-wide tracing setup shared by directory hosts.

/// Initialize tracing with the default settings (JSON, `RUST_LOG`, `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    let config = tracing::TracingConfig::default();
    if tracing::init(&config) {
        ::tracing::info!(
            filter = %config.default_filter,
            json = config.json,
            "tracing initialized"
        );
    }
}

pub mod tracing;
