//! Permission data model
//!
//! The [`PermissionSet`] is the authoritative per-user snapshot loaded from
//! the remote source; the [`DecisionCache`] memoizes per-selector answers
//! with TTL expiry so UI passes stay cheap.

pub mod cache;
pub mod set;

pub use cache::{cache_key, CacheEntry, DecisionCache};
pub use set::PermissionSet;
