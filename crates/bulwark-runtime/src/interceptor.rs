//! Outgoing request instrumentation
//!
//! Wraps an injected request executor so failures and timeouts are captured
//! without altering the success path or the returned error: the wrapped call
//! behaves exactly like the bare one from the application's perspective.

use async_trait::async_trait;
use tracing::debug;

use crate::telemetry::{FailureSignal, TelemetryHandle};
use crate::transport::{OutboundRequest, OutboundResponse, RequestExecutor, TransportError};

// ----------------------------------------------------------------------------
// Request API Styles
// ----------------------------------------------------------------------------

/// Which host request mechanism a wrapped executor stands in for
///
/// The legacy callback-style mechanism reports timeouts as their own kind;
/// the promise-style mechanism folds every failure into one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestApi {
    Ajax,
    Fetch,
}

// ----------------------------------------------------------------------------
// Instrumented Executor
// ----------------------------------------------------------------------------

/// Decorator capturing request failures into the telemetry queue
pub struct InstrumentedExecutor<E: RequestExecutor> {
    inner: E,
    api: RequestApi,
    telemetry: TelemetryHandle,
}

impl<E: RequestExecutor> InstrumentedExecutor<E> {
    /// Wrap an executor, tagging its captures with the given API style
    pub fn new(inner: E, api: RequestApi, telemetry: TelemetryHandle) -> Self {
        Self {
            inner,
            api,
            telemetry,
        }
    }

    /// Access the wrapped executor
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: RequestExecutor> RequestExecutor for InstrumentedExecutor<E> {
    async fn execute(&self, request: &OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let started = std::time::Instant::now();
        let result = self.inner.execute(request).await;

        if let Err(err) = &result {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let status = match err {
                TransportError::Status { status } => Some(*status),
                _ => None,
            };
            let timed_out = matches!(err, TransportError::Timeout { .. });
            debug!(
                method = %request.method,
                url = %request.url,
                error = %err,
                "captured failed request"
            );
            self.telemetry.try_capture(FailureSignal::Request {
                api: self.api,
                method: request.method.clone(),
                status,
                message: err.to_string(),
                elapsed_ms,
                timed_out,
            });
        }

        // The original outcome is returned unchanged either way
        result
    }
}
