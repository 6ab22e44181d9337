//! Structured logging for static mocks.
//!
//! Lifecycle and routing events go through the helpers below so that every
//! event carries the same field names (`class`, `method`, `thread`).

use crate::identity::{CallSignature, ClassId, ThreadIdentity};
use crate::invocation::Outcome;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the tracing filter for tests.
pub const LOG_FILTER_ENV: &str = "STATIC_MOCK_LOG";

/// Set to any value to emit JSON log lines.
pub const LOG_JSON_ENV: &str = "STATIC_MOCK_LOG_JSON";

const FALLBACK_FILTER: &str = "static_mock=warn";

/// Install a stderr subscriber for test runs.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| FALLBACK_FILTER.into());

    let result = if std::env::var(LOG_JSON_ENV).is_ok() {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_test_writer()
            .with_target(true)
            .with_level(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_level(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };
    // A subscriber installed by an earlier test is fine.
    let _ = result;
}

/// Log a new binding.
pub fn log_binding_opened(class: &ClassId, owner: &ThreadIdentity) {
    tracing::debug!(class = class.name(), thread = %owner, "Static mock opened");
}

/// Log a released binding.
pub fn log_binding_closed(class: &ClassId, owner: &ThreadIdentity) {
    tracing::debug!(class = class.name(), thread = %owner, "Static mock closed");
}

pub fn log_redirect_installed(class: &ClassId, token: u64) {
    tracing::trace!(class = class.name(), token, "Redirect installed");
}

pub fn log_redirect_removed(class: &ClassId, token: u64) {
    tracing::trace!(class = class.name(), token, "Redirect removed");
}

/// Log a stub rule registration.
pub fn log_stub_registered(class: &ClassId, signature: &CallSignature) {
    tracing::debug!(class = class.name(), method = %signature, "Stub registered");
}

/// Log a call routed through a binding.
pub fn log_routed_call(
    class: &ClassId,
    signature: &CallSignature,
    sequence: u64,
    outcome: Outcome,
) {
    tracing::trace!(
        class = class.name(),
        method = %signature,
        sequence,
        outcome = ?outcome,
        "Static call routed"
    );
}

/// Log a call that fell through because no binding applies.
pub fn log_unrouted_call(class: &ClassId, signature: &CallSignature) {
    tracing::trace!(
        class = class.name(),
        method = %signature,
        "No active static mock, calling real method"
    );
}

pub fn log_verification_failed(class: &ClassId, wanted: &str, actual: usize) {
    tracing::debug!(class = class.name(), wanted, actual, "Verification failed");
}

/// Log a mock dropped without an explicit close that could not be released.
pub fn log_release_failed(class: &ClassId, error: &dyn std::fmt::Display) {
    tracing::warn!(class = class.name(), error = %error, "Failed to release static mock on drop");
}

/// Log binding reset.
pub fn log_reset(class: &ClassId, invocations_only: bool) {
    if invocations_only {
        tracing::debug!(class = class.name(), "Invocations cleared");
    } else {
        tracing::debug!(class = class.name(), "Static mock reset");
    }
}
