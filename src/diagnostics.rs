//! Optional helper for wiring up the engine's own operational logging.
//!
//! The engine emits `tracing` events for conditions a host operator cares
//! about but a producer never sees through the intake API: channel-full
//! fallbacks, buffer-pressure drops, stale high-load timers. This is the
//! "diagnostic Sink used by the host runtime" spec's error-handling design
//! refers to — distinct from the primary [`crate::Sink`] being throttled.
//!
//! As a library, this crate never calls [`tracing::subscriber::set_global_default`]
//! on its own; only a binary should own that decision. This function is a
//! convenience for hosts (and for this crate's own integration tests) that
//! have not already set up a subscriber, grounded on the teacher's
//! `backend::init_global_if_needed`, minus the PyO3-specific state-guard and
//! error conversion (no Python host to report failures back to here).
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Install a default `fmt` subscriber writing to stderr, honoring `RUST_LOG`.
/// Returns `Err` if a global subscriber is already set; callers that don't
/// care may safely ignore the result.
pub fn init_default_subscriber() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let console_layer = fmt::layer()
        .with_span_events(FmtSpan::NONE)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
        .from_env_lossy();

    let subscriber = Registry::default().with(filter).with(console_layer);
    tracing::subscriber::set_global_default(subscriber)
}
