//! Tracing subscriber setup for applications using the client.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Install a fmt subscriber filtered by `ECFEED_LOG`.
///
/// `ECFEED_LOG` takes the usual directive syntax, e.g.
/// `ECFEED_LOG=ecfeed_core=debug,ecfeed_protocol=warn`. Without it (or when
/// it does not parse) both crates log at `info`. Safe to call repeatedly.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("ECFEED_LOG")
            .unwrap_or_else(|_| EnvFilter::new("ecfeed_core=info,ecfeed_protocol=info"));

        let installed = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .with(filter)
            .try_init();
        if installed.is_err() {
            tracing::debug!("A global subscriber is already installed");
        }
    });
}
