//! Wire payloads for the remote sink and permission source
//!
//! The concrete endpoint stays an opaque request/response contract; these
//! are the payload shapes and the authenticity-token resolution the
//! transports share.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::permissions::PermissionSet;
use crate::telemetry::ErrorRecord;
use crate::types::Timestamp;

/// Action tag carried alongside every error batch submission
pub const ERROR_BATCH_ACTION: &str = "log_client_error";

// ----------------------------------------------------------------------------
// Error Batch Submission
// ----------------------------------------------------------------------------

/// One flush worth of records, sent as a single request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBatch {
    pub errors: Vec<ErrorRecord>,
    pub batch: bool,
    pub timestamp: u64,
}

impl ErrorBatch {
    /// Create a batch payload stamped with the client-side send time
    pub fn new(errors: Vec<ErrorRecord>, now: Timestamp) -> Self {
        Self {
            errors,
            batch: true,
            timestamp: now.as_millis(),
        }
    }

    /// Number of records in the batch
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the batch carries no records
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Permission Responses
// ----------------------------------------------------------------------------

/// Response to a full permission-set load
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionLoadResponse {
    pub success: bool,
    #[serde(default)]
    pub permissions: Option<PermissionSet>,
}

/// Response to a single-selector permission check
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheckResponse {
    pub success: bool,
    #[serde(default)]
    pub can_edit: bool,
}

// ----------------------------------------------------------------------------
// Host Globals
// ----------------------------------------------------------------------------

/// Global names probed for the authenticity token, in resolution order
const TOKEN_GLOBAL_NAMES: &[&str] = &[
    "bulwarkConfig",
    "adminPageData",
    "appSettings",
    "ajaxConfig",
];

/// Host-page-provided global configuration values
///
/// The host exposes its request token under one of several historical global
/// names; the first non-empty candidate wins.
#[derive(Debug, Clone, Default)]
pub struct HostGlobals {
    values: HashMap<String, String>,
}

impl HostGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a global value by name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Read a global value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Resolve the authenticity token: first non-empty candidate in order
    pub fn auth_token(&self) -> Option<&str> {
        TOKEN_GLOBAL_NAMES
            .iter()
            .filter_map(|name| self.get(name))
            .find(|value| !value.is_empty())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HostGlobals {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
