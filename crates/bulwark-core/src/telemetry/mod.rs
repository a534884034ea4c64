//! Error telemetry data model
//!
//! Captured failures are normalized into [`ErrorRecord`]s, enriched with
//! session and environment context, and held in the bounded [`ErrorQueue`]
//! until the runtime flushes them to the remote sink.

pub mod critical;
pub mod queue;
pub mod record;

pub use critical::is_critical;
pub use queue::ErrorQueue;
pub use record::{
    Enrichment, Environment, ErrorKind, ErrorRecord, MemoryUsage, PageEnvironment, ScreenInfo,
    StaticEnvironment, Viewport,
};
