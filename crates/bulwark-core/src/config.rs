//! Centralized Configuration Management
//!
//! This module consolidates the configuration structures for both components
//! so the runtime builder has a single, validated configuration surface.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

// ----------------------------------------------------------------------------
// Telemetry Configuration
// ----------------------------------------------------------------------------

/// Configuration for the error telemetry queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Maximum number of records held in the queue (oldest evicted first)
    pub max_queue_size: usize,
    /// Interval between periodic flush attempts
    pub flush_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 50,
            flush_interval: Duration::from_millis(5_000),
        }
    }
}

impl TelemetryConfig {
    /// Create a configuration suited to fast-running tests
    pub fn testing() -> Self {
        Self {
            max_queue_size: 5,
            flush_interval: Duration::from_millis(20),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(CoreError::InvalidConfiguration {
                reason: "max_queue_size must be at least 1".into(),
            });
        }
        if self.flush_interval.is_zero() {
            return Err(CoreError::InvalidConfiguration {
                reason: "flush_interval must be non-zero".into(),
            });
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Permission Configuration
// ----------------------------------------------------------------------------

/// Configuration for the permission cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// TTL for memoized decisions and the persistent mirror; also the period
    /// of the housekeeping sweep
    pub cache_timeout: Duration,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            cache_timeout: Duration::from_millis(300_000),
        }
    }
}

impl PermissionConfig {
    /// Create a configuration suited to fast-running tests
    pub fn testing() -> Self {
        Self {
            cache_timeout: Duration::from_millis(50),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache_timeout.is_zero() {
            return Err(CoreError::InvalidConfiguration {
                reason: "cache_timeout must be non-zero".into(),
            });
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Buffer sizes for the runtime's channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Buffer size for telemetry command channels (capture points → task)
    pub command_buffer_size: usize,
    /// Buffer size for browser event channels (host glue → dispatcher)
    pub browser_event_buffer_size: usize,
    /// Buffer size for app event channels (components → host UI)
    pub app_event_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 64,       // capture bursts during error storms
            browser_event_buffer_size: 32, // browser events are infrequent
            app_event_buffer_size: 16,     // one event per permission load
        }
    }
}

impl ChannelConfig {
    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            command_buffer_size: 128,
            browser_event_buffer_size: 128,
            app_event_buffer_size: 128,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let telemetry = TelemetryConfig::default();
        assert_eq!(telemetry.max_queue_size, 50);
        assert_eq!(telemetry.flush_interval, Duration::from_millis(5_000));

        let permissions = PermissionConfig::default();
        assert_eq!(permissions.cache_timeout, Duration::from_millis(300_000));
    }

    #[test]
    fn test_validation_rejects_degenerate_configs() {
        let mut telemetry = TelemetryConfig::default();
        telemetry.max_queue_size = 0;
        assert!(telemetry.validate().is_err());

        let mut telemetry = TelemetryConfig::default();
        telemetry.flush_interval = Duration::ZERO;
        assert!(telemetry.validate().is_err());

        let mut permissions = PermissionConfig::default();
        permissions.cache_timeout = Duration::ZERO;
        assert!(permissions.validate().is_err());

        assert!(TelemetryConfig::default().validate().is_ok());
        assert!(PermissionConfig::default().validate().is_ok());
    }
}
