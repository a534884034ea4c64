//! Critical-error detection
//!
//! A record is judged critical when its message or stack text matches any of
//! a fixed set of case-insensitive patterns. Critical records trigger an
//! immediate flush attempt instead of waiting for the periodic timer.

// ----------------------------------------------------------------------------
// Pattern Table
// ----------------------------------------------------------------------------

/// Case-insensitive substrings that escalate a record to critical
///
/// Grouped by failure class: null-reference access, missing-method calls,
/// permission/authorization failures, and network-security failures.
const CRITICAL_PATTERNS: &[&str] = &[
    // Null-reference access
    "cannot read propert",
    "cannot set propert",
    "null is not an object",
    "undefined is not an object",
    // Missing-method calls
    "is not a function",
    // Permission / authorization failures
    "permission denied",
    "unauthorized",
    "forbidden",
    // Network-security failures
    "failed to fetch",
    "networkerror",
    "net::err",
    "blocked by cors",
];

// ----------------------------------------------------------------------------
// Matcher
// ----------------------------------------------------------------------------

/// Check whether a message or stack text matches any critical pattern
pub fn is_critical(message: &str, stack: Option<&str>) -> bool {
    let message = message.to_lowercase();
    if CRITICAL_PATTERNS.iter().any(|p| message.contains(p)) {
        return true;
    }
    if let Some(stack) = stack {
        let stack = stack.to_lowercase();
        return CRITICAL_PATTERNS.iter().any(|p| stack.contains(p));
    }
    false
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_method_is_critical() {
        assert!(is_critical("TypeError: x is not a function", None));
    }

    #[test]
    fn test_benign_message_is_not_critical() {
        assert!(!is_critical("Deprecated API usage", None));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert!(is_critical("PERMISSION DENIED while saving", None));
        assert!(is_critical("Cannot Read Properties of null", None));
    }

    #[test]
    fn test_stack_text_also_matches() {
        assert!(is_critical(
            "Script error",
            Some("TypeError: Cannot read property 'id' of undefined\n  at save()")
        ));
        assert!(!is_critical("Script error", Some("at render (app.js:4:2)")));
    }

    #[test]
    fn test_network_security_patterns() {
        assert!(is_critical("TypeError: Failed to fetch", None));
        assert!(is_critical("request blocked by CORS policy", None));
    }
}
