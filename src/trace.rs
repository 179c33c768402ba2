//! Tracing setup for motesync.
//!
//! Protocol anomalies (short packets, rejected commands, reboots) are reported
//! through `tracing` rather than surfaced to the caller, so a subscriber is
//! the only way to observe them.

/// Initialize the tracing subscriber with timestamps.
///
/// Call this at the start of tests or the host binary to enable trace output.
/// The filter defaults to `motesync=info` and can be overridden via
/// `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("motesync=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .init();
}

pub(crate) use tracing::{debug, info, warn};
