//! Normalized error records and capture-time enrichment
//!
//! Every capture surface produces the same record shape; the kind-specific
//! fields stay `None` for kinds that do not use them. Field names serialize
//! in camelCase because the sink contract predates this port.

use serde::{Deserialize, Serialize};

use crate::types::SessionId;

// ----------------------------------------------------------------------------
// Error Kind
// ----------------------------------------------------------------------------

/// Classification of a captured failure by its capture surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    JavascriptError,
    PromiseRejection,
    ConsoleError,
    AjaxError,
    AjaxTimeout,
    FetchError,
    ManualReport,
}

// ----------------------------------------------------------------------------
// Page Environment
// ----------------------------------------------------------------------------

/// Viewport geometry at capture time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scroll_x: i32,
    pub scroll_y: i32,
}

/// Physical screen descriptor at capture time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub avail_width: u32,
    pub avail_height: u32,
    pub color_depth: u8,
    pub pixel_depth: u8,
}

/// Heap memory snapshot, when the host exposes one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub used_js_heap_size: u64,
    pub total_js_heap_size: u64,
    pub js_heap_size_limit: u64,
}

/// Page-level context shared by every record captured on the same page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvironment {
    pub url: String,
    pub user_agent: String,
    pub viewport: Viewport,
    pub screen: ScreenInfo,
}

// ----------------------------------------------------------------------------
// Environment Probe
// ----------------------------------------------------------------------------

/// Capability trait for reading the host environment at capture time
///
/// Every optional reading degrades to `None` when the underlying host
/// capability is absent; probing never fails.
pub trait Environment: Send + Sync {
    /// Current page context
    fn page(&self) -> PageEnvironment;

    /// Heap memory snapshot, if the host exposes one
    fn memory_usage(&self) -> Option<MemoryUsage> {
        None
    }

    /// Network connection descriptor (e.g. "4g"), if the host exposes one
    fn connection_type(&self) -> Option<String> {
        None
    }
}

/// Fixed environment, used as the default probe and in tests
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub page: PageEnvironment,
    pub memory: Option<MemoryUsage>,
    pub connection: Option<String>,
}

impl StaticEnvironment {
    /// Create a probe that always reports the given page context
    pub fn new(page: PageEnvironment) -> Self {
        Self {
            page,
            memory: None,
            connection: None,
        }
    }
}

impl Environment for StaticEnvironment {
    fn page(&self) -> PageEnvironment {
        self.page.clone()
    }

    fn memory_usage(&self) -> Option<MemoryUsage> {
        self.memory
    }

    fn connection_type(&self) -> Option<String> {
        self.connection.clone()
    }
}

// ----------------------------------------------------------------------------
// Enrichment
// ----------------------------------------------------------------------------

/// Capture-time enrichment attached to every record
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub session_id: SessionId,
    pub page_load_time_ms: u64,
    pub memory_usage: Option<MemoryUsage>,
    pub connection_type: Option<String>,
}

// ----------------------------------------------------------------------------
// Error Record
// ----------------------------------------------------------------------------

/// One captured failure, immutable once enqueued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub timestamp_ms: u64,
    pub url: String,
    pub user_agent: String,
    pub viewport: Viewport,
    pub screen: ScreenInfo,

    // Kind-specific: javascript_error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,

    // Kind-specific: ajax_error / ajax_timeout / fetch_error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,

    // Enrichment
    pub session_id: SessionId,
    pub page_load_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<MemoryUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
}

impl ErrorRecord {
    /// Create a record with no kind-specific fields set
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        page: PageEnvironment,
        enrichment: Enrichment,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: None,
            timestamp_ms,
            url: page.url,
            user_agent: page.user_agent,
            viewport: page.viewport,
            screen: page.screen,
            filename: None,
            lineno: None,
            colno: None,
            method: None,
            status: None,
            execution_time_ms: None,
            session_id: enrichment.session_id,
            page_load_time_ms: enrichment.page_load_time_ms,
            memory_usage: enrichment.memory_usage,
            connection_type: enrichment.connection_type,
        }
    }

    /// Attach a stack trace
    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }

    /// Attach script location fields (javascript_error)
    pub fn with_script_location(
        mut self,
        filename: Option<String>,
        lineno: Option<u32>,
        colno: Option<u32>,
    ) -> Self {
        self.filename = filename;
        self.lineno = lineno;
        self.colno = colno;
        self
    }

    /// Attach request fields (ajax_error / ajax_timeout / fetch_error)
    pub fn with_request(
        mut self,
        method: impl Into<String>,
        status: Option<u16>,
        execution_time_ms: u64,
    ) -> Self {
        self.method = Some(method.into());
        self.status = status;
        self.execution_time_ms = Some(execution_time_ms);
        self
    }

    /// Whether this record matches the critical escalation patterns
    pub fn is_critical(&self) -> bool {
        super::critical::is_critical(&self.message, self.stack.as_deref())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
