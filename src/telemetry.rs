//! Telemetry logic.
//! Support logging and metrics.

use metrics::Unit;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub(crate) const ACCOUNTS_REGISTERED: &str = "accounts_registered_total";
pub(crate) const REGISTRATIONS_REJECTED: &str =
    "accounts_registration_rejected_total";

/// Install a formatted `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    if subscriber.try_init().is_err() {
        tracing::warn!("tracing subscriber already initialised");
    }
}

/// Describe every metric emitted by the registry.
pub fn describe_metrics() {
    metrics::describe_counter!(
        ACCOUNTS_REGISTERED,
        Unit::Count,
        "Accounts successfully registered."
    );
    metrics::describe_counter!(
        REGISTRATIONS_REJECTED,
        Unit::Count,
        "Registrations rejected, labelled by reason."
    );
}

/// Count a rejected registration.
pub(crate) fn record_rejection(reason: &'static str) {
    metrics::counter!(REGISTRATIONS_REJECTED, "reason" => reason).increment(1);
}
