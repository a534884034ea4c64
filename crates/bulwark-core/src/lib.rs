//! Bulwark Core
//!
//! This crate provides the platform-free data model and pure logic for the
//! bulwark client resiliency layer: the bounded error telemetry queue, the
//! permission set evaluator and its TTL decision cache, wire payloads for the
//! remote sink/source, and the capability traits (time, storage, environment)
//! that the runtime crate wires to a concrete host.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod permissions;
pub mod storage;
pub mod telemetry;
pub mod types;
pub mod wire;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{ChannelConfig, PermissionConfig, TelemetryConfig};
pub use permissions::{cache_key, DecisionCache, PermissionSet};
pub use storage::{MemoryStorage, MirrorStorage, PermissionMirror, SessionStorage, StorageError};
pub use telemetry::{
    Enrichment, Environment, ErrorKind, ErrorQueue, ErrorRecord, MemoryUsage, PageEnvironment,
    ScreenInfo, StaticEnvironment, Viewport,
};
pub use types::{ManualTimeSource, SessionId, SystemTimeSource, TimeSource, Timestamp, UserId};
pub use wire::{ErrorBatch, HostGlobals, PermissionCheckResponse, PermissionLoadResponse};

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Core error types for the bulwark data model
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

pub type Result<T> = core::result::Result<T, CoreError>;
