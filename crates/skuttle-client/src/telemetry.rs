//! Crash and error reporting seam.
//!
//! Reports are fire-and-forget: implementations must return immediately and
//! do any slow delivery on their own.

use std::error::Error;

use tracing::error;

pub trait Telemetry: Send + Sync + 'static {
    /// Report a failure that was handled (logged, swallowed or retried).
    fn report(&self, context: &str, error: &(dyn Error + 'static));
}

/// Sends reports to the `tracing` pipeline only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn report(&self, context: &str, err: &(dyn Error + 'static)) {
        let mut chain = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        error!(context, error = %chain, "Reported error");
    }
}
