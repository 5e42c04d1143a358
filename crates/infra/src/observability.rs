//! Tracing setup
//!
//! One subscriber for the whole process, configured from `RUST_LOG` with an
//! `info` default. Credentials and unredacted emails must never be passed as
//! structured fields; callers redact via `schulgate_common::redact_email`
//! before logging identities.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to `info` when unset. Calling this twice is
/// harmless: a subscriber installed elsewhere (tests, an embedding binary)
/// wins and the second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
