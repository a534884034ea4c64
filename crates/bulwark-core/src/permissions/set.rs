//! Permission set and selector matching
//!
//! One snapshot per user, replaced wholesale on reload, never patched
//! field-by-field. Selector matching cascades through the rules below with
//! first match winning:
//!
//! 1. `can_edit == false` denies unconditionally.
//! 2. A universal wildcard in the allowed list grants everything.
//! 3. An exact-selector override grants or revokes ahead of pattern
//!    matching (an override can revoke a selector that a broader allowed
//!    pattern would otherwise reach).
//! 4. Allowed patterns grant on exact match, prefix match (the query is the
//!    pattern or one of its descendants), or wildcard expansion.
//! 5. Default deny.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Permission Set
// ----------------------------------------------------------------------------

/// Universal wildcard pattern granting every selector
pub const WILDCARD: &str = "*";

/// Authoritative permission snapshot for one user
///
/// Action-level flags arrive as flattened `can_<action>` keys on the wire
/// and are kept as raw JSON values so unknown shapes never fail a load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub allowed_elements: Vec<String>,
    #[serde(default)]
    pub element_overrides: HashMap<String, bool>,
    #[serde(flatten)]
    pub actions: HashMap<String, serde_json::Value>,
}

impl PermissionSet {
    /// Evaluate "can the user edit the element matched by this selector"
    pub fn can_edit_element(&self, selector: &str) -> bool {
        if !self.can_edit {
            return false;
        }
        if self.allowed_elements.iter().any(|p| p == WILDCARD) {
            return true;
        }
        if let Some(&allowed) = self.element_overrides.get(selector) {
            return allowed;
        }
        for pattern in &self.allowed_elements {
            if pattern.is_empty() {
                // An uncompilable pattern is a non-match, not an error
                continue;
            }
            if selector == pattern
                || selector.starts_with(pattern.as_str())
                || wildcard_match(pattern, selector)
            {
                return true;
            }
        }
        false
    }

    /// Evaluate an action-level flag, looked up as `can_<action>`
    pub fn can_perform(&self, action: &str) -> bool {
        self.actions
            .get(&format!("can_{action}"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

// ----------------------------------------------------------------------------
// Wildcard Matching
// ----------------------------------------------------------------------------

/// Match a selector against a pattern whose `*` characters expand
/// permissively (any run of characters, including none)
///
/// A pattern that cannot be compiled into a matcher is a non-match for that
/// pattern, never an error; here that is the empty pattern.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if pattern.is_empty() || !pattern.contains('*') {
        return false;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut pos = 0;

    // Leading literal must anchor at the start
    let first = parts[0];
    if !text[pos..].starts_with(first) {
        return false;
    }
    pos += first.len();

    // Middle literals match in order, each after the previous
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(offset) => pos += offset + part.len(),
            None => return false,
        }
    }

    // Trailing literal must anchor at the end
    let last = parts[parts.len() - 1];
    last.is_empty() || text[pos..].ends_with(last)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
