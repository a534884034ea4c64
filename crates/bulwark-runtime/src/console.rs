//! Error-level console mirroring
//!
//! Decorates the host's error logger: the original logging behavior is
//! preserved (forwarded first, never suppressed) and the message is
//! additionally mirrored into the telemetry queue.

use crate::telemetry::{FailureSignal, TelemetryHandle};

// ----------------------------------------------------------------------------
// Error Logger
// ----------------------------------------------------------------------------

/// The host's error-level logging capability
pub trait ErrorLogger: Send + Sync {
    fn log_error(&self, message: &str);
}

/// Default logger routing error-level messages through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ErrorLogger for TracingLogger {
    fn log_error(&self, message: &str) {
        tracing::error!(target: "bulwark::console", "{message}");
    }
}

impl<L: ErrorLogger + ?Sized> ErrorLogger for std::sync::Arc<L> {
    fn log_error(&self, message: &str) {
        (**self).log_error(message);
    }
}

// ----------------------------------------------------------------------------
// Console Mirror
// ----------------------------------------------------------------------------

/// Decorator mirroring error-level messages into the telemetry queue
pub struct ConsoleMirror<L: ErrorLogger> {
    inner: L,
    telemetry: TelemetryHandle,
}

impl<L: ErrorLogger> ConsoleMirror<L> {
    pub fn new(inner: L, telemetry: TelemetryHandle) -> Self {
        Self { inner, telemetry }
    }
}

impl<L: ErrorLogger> ErrorLogger for ConsoleMirror<L> {
    fn log_error(&self, message: &str) {
        // Original behavior first; capture must never suppress it
        self.inner.log_error(message);
        self.telemetry.try_capture(FailureSignal::Console {
            message: message.to_string(),
        });
    }
}
