//! Persistent local storage seams
//!
//! The original relied on session-scoped storage for the session id and a
//! single user-keyed local slot mirroring the permission set. Both are
//! best-effort: the host may evict them at any time, and write failures must
//! never block the in-memory path. The traits here model that contract; the
//! runtime decides what to do when a call fails (log and continue).

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::permissions::PermissionSet;
use crate::types::{Timestamp, UserId};

/// Session-scoped key holding the session id string
pub const SESSION_ID_KEY: &str = "bulwark_session_id";

/// Local key holding the permission mirror slot
pub const PERMISSION_MIRROR_KEY: &str = "bulwark_permissions";

// ----------------------------------------------------------------------------
// Storage Errors
// ----------------------------------------------------------------------------

/// Errors from the host's persistent storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage read failed: {reason}")]
    Read { reason: String },

    #[error("storage write failed: {reason}")]
    Write { reason: String },
}

// ----------------------------------------------------------------------------
// Session Storage
// ----------------------------------------------------------------------------

/// Session-scoped string storage (cleared when the session ends)
pub trait SessionStorage: Send + Sync {
    /// Read a value, `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

// ----------------------------------------------------------------------------
// Permission Mirror
// ----------------------------------------------------------------------------

/// Persistent mirror of the loaded permission set
///
/// A single slot per host: a load for a different user id invalidates the
/// slot rather than merging with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionMirror {
    pub permissions: PermissionSet,
    pub timestamp: Timestamp,
    pub user_id: UserId,
}

/// Storage for the permission mirror slot
pub trait MirrorStorage: Send + Sync {
    /// Read the mirror slot, `None` when absent or unreadable as a mirror
    fn load(&self) -> Result<Option<PermissionMirror>, StorageError>;

    /// Replace the mirror slot
    fn store(&self, mirror: &PermissionMirror) -> Result<(), StorageError>;

    /// Clear the mirror slot
    fn clear(&self) -> Result<(), StorageError>;
}

// ----------------------------------------------------------------------------
// In-Memory Storage
// ----------------------------------------------------------------------------

/// In-memory implementation of both storage traits
///
/// Default storage when the host provides none, and the workhorse for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|e| StorageError::Read {
            reason: e.to_string(),
        })?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|e| StorageError::Write {
            reason: e.to_string(),
        })?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl MirrorStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PermissionMirror>, StorageError> {
        let values = self.values.lock().map_err(|e| StorageError::Read {
            reason: e.to_string(),
        })?;
        match values.get(PERMISSION_MIRROR_KEY) {
            // A corrupt slot reads as absent rather than failing the load path
            Some(raw) => Ok(serde_json::from_str(raw).ok()),
            None => Ok(None),
        }
    }

    fn store(&self, mirror: &PermissionMirror) -> Result<(), StorageError> {
        let raw = serde_json::to_string(mirror).map_err(|e| StorageError::Write {
            reason: e.to_string(),
        })?;
        let mut values = self.values.lock().map_err(|e| StorageError::Write {
            reason: e.to_string(),
        })?;
        values.insert(PERMISSION_MIRROR_KEY.to_string(), raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|e| StorageError::Write {
            reason: e.to_string(),
        })?;
        values.remove(PERMISSION_MIRROR_KEY);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
