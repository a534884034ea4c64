//! Events exchanged with the host page
//!
//! The host glue translates its native events into [`BrowserEvent`]s and
//! pushes them at the runtime's dispatcher; the runtime answers with
//! [`AppEvent`]s the host UI can subscribe to.

use bulwark_core::{PermissionSet, UserId};

// ----------------------------------------------------------------------------
// Browser Events (consumed)
// ----------------------------------------------------------------------------

/// Host events driving both components
#[derive(Debug, Clone)]
pub enum BrowserEvent {
    /// Uncaught synchronous error at the global scope
    UncaughtError {
        message: String,
        stack: Option<String>,
        filename: Option<String>,
        lineno: Option<u32>,
        colno: Option<u32>,
    },
    /// Uncaught promise rejection at the global scope
    UnhandledRejection {
        reason: String,
        stack: Option<String>,
    },
    /// Connectivity restored
    Online,
    /// Connectivity lost
    Offline,
    /// The user's permissions changed server-side; reload them
    PermissionsChanged,
    /// A different user took over the session
    UserChanged { user_id: UserId },
}

// ----------------------------------------------------------------------------
// App Events (produced)
// ----------------------------------------------------------------------------

/// Events the runtime raises back at the host
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A permission set finished loading successfully
    PermissionsLoaded {
        user_id: UserId,
        permissions: PermissionSet,
    },
}
