//! Bulwark Runtime
//!
//! Tokio-based orchestration for the bulwark client resiliency layer. The
//! telemetry queue runs as a single owned task fed by capture commands; the
//! permission cache is a shared manager whose decisions interleave
//! cooperatively. [`RuntimeBuilder`] wires both to the host's injected
//! capabilities (request executor, sink, source, storage, environment) and
//! spawns the periodic flush and sweep loops.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod builder;
pub mod console;
pub mod events;
pub mod interceptor;
pub mod permissions;
pub mod telemetry;
pub mod transport;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use builder::{ClientRuntime, RuntimeBuilder};
pub use console::{ConsoleMirror, ErrorLogger, TracingLogger};
pub use events::{AppEvent, BrowserEvent};
pub use interceptor::{InstrumentedExecutor, RequestApi};
pub use permissions::PermissionManager;
pub use telemetry::{FailureSignal, FlushOutcome, TelemetryHandle, TelemetryTask};
pub use transport::{
    ErrorSink, OutboundRequest, OutboundResponse, PermissionSource, RequestExecutor,
    TransportError,
};

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Runtime error types
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Core error: {0}")]
    Core(#[from] bulwark_core::CoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Channel closed: {context}")]
    ChannelClosed { context: String },

    #[error("Missing runtime dependency: {name}")]
    MissingDependency { name: &'static str },
}

pub type Result<T> = core::result::Result<T, RuntimeError>;
