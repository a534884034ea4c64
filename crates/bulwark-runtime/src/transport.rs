//! Transport seams for the remote sink and permission source
//!
//! The concrete endpoint (URL scheme, encoding, authenticity token carriage)
//! lives behind these traits. A transport-level timeout is just another
//! failure; nothing here cancels an in-flight call.

use async_trait::async_trait;

use bulwark_core::{ErrorBatch, PermissionCheckResponse, PermissionLoadResponse, UserId};

// ----------------------------------------------------------------------------
// Transport Errors
// ----------------------------------------------------------------------------

/// Errors from outbound remote calls
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed with status {status}")]
    Status { status: u16 },

    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },
}

// ----------------------------------------------------------------------------
// Error Sink
// ----------------------------------------------------------------------------

/// Remote sink accepting error batches
///
/// One call per flush. Concrete implementations carry the
/// [`bulwark_core::wire::ERROR_BATCH_ACTION`] tag and the authenticity
/// token resolved via [`bulwark_core::HostGlobals`] on each request. Any
/// error return counts as a send failure and the caller restores the batch
/// for retry on the next trigger.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    /// Submit one batch; success means a success-range response status
    async fn submit_batch(&self, batch: &ErrorBatch) -> Result<(), TransportError>;
}

// ----------------------------------------------------------------------------
// Permission Source
// ----------------------------------------------------------------------------

/// Remote source of permission data
///
/// Like [`ErrorSink`], concrete implementations attach the authenticity
/// token resolved via [`bulwark_core::HostGlobals`] to each call.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Load the full permission set for a user
    async fn load_permissions(
        &self,
        user_id: &UserId,
    ) -> Result<PermissionLoadResponse, TransportError>;

    /// Check a single selector for a user
    async fn check_selector(
        &self,
        user_id: &UserId,
        selector: &str,
    ) -> Result<PermissionCheckResponse, TransportError>;
}

// ----------------------------------------------------------------------------
// Request Executor
// ----------------------------------------------------------------------------

/// An application-level outbound request, as seen by the interceptor
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// An application-level response
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: u16,
    pub body: String,
}

/// The host's request mechanism, wrapped by [`crate::InstrumentedExecutor`]
///
/// Implementations surface non-success response statuses as
/// [`TransportError::Status`] so failure capture sees them; a timeout is
/// [`TransportError::Timeout`].
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: &OutboundRequest) -> Result<OutboundResponse, TransportError>;
}
