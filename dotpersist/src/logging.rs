//! Tracing setup for the `dotpersist` binary.
//!
//! Sync progress and failures are reported through `tracing` events; this is
//! the only output the hook produces, so the default level is `info`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directive when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Install the stderr subscriber.
///
/// ```bash
/// RUST_LOG=dotpersist=debug dotpersist pull
/// ```
///
/// A host that already installed a global subscriber keeps it.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}
