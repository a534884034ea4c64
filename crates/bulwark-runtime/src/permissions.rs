//! Permission cache manager
//!
//! Resolves "can the current user edit element X / perform action Y" from a
//! single authoritative remote load plus fallbacks. Decisions are memoized
//! with TTL expiry; batch checks run concurrently as cooperative tasks, so a
//! long batch never assumes atomicity across its awaits; cache writes are
//! last-write-wins per key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use bulwark_core::permissions::cache_key;
use bulwark_core::{
    DecisionCache, MirrorStorage, PermissionConfig, PermissionMirror, PermissionSet, TimeSource,
    UserId,
};

use crate::events::AppEvent;
use crate::transport::PermissionSource;

// ----------------------------------------------------------------------------
// Manager State
// ----------------------------------------------------------------------------

struct State {
    user_id: UserId,
    set: Option<PermissionSet>,
    cache: DecisionCache,
}

struct Shared<T: TimeSource> {
    config: PermissionConfig,
    source: Arc<dyn PermissionSource>,
    mirror: Arc<dyn MirrorStorage>,
    app_events: mpsc::Sender<AppEvent>,
    time_source: T,
    state: Mutex<State>,
}

// ----------------------------------------------------------------------------
// Permission Manager
// ----------------------------------------------------------------------------

/// Shared handle to the permission state
///
/// Clones share one cache and one permission set. The inner lock is never
/// held across an await, so decisions interleave cooperatively.
pub struct PermissionManager<T: TimeSource> {
    shared: Arc<Shared<T>>,
}

impl<T: TimeSource> Clone for PermissionManager<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: TimeSource> PermissionManager<T> {
    /// Create a manager in the Unloaded state
    ///
    /// Callers follow up with [`PermissionManager::load`]; the builder does
    /// this automatically on construction.
    pub fn new(
        config: PermissionConfig,
        user_id: UserId,
        source: Arc<dyn PermissionSource>,
        mirror: Arc<dyn MirrorStorage>,
        app_events: mpsc::Sender<AppEvent>,
        time_source: T,
    ) -> Self {
        let cache = DecisionCache::new(config.cache_timeout);
        Self {
            shared: Arc::new(Shared {
                config,
                source,
                mirror,
                app_events,
                time_source,
                state: Mutex::new(State {
                    user_id,
                    set: None,
                    cache,
                }),
            }),
        }
    }

    /// Load the permission set: persistent mirror fast path, then remote
    ///
    /// Failure leaves the set absent; decisions fall back to per-selector
    /// remote checks and default-deny.
    pub async fn load(&self) {
        let user_id = self.lock_state().user_id.clone();
        let now = self.shared.time_source.now();

        // Mirror fast path: same user, younger than the TTL
        match self.shared.mirror.load() {
            Ok(Some(mirror))
                if mirror.user_id == user_id
                    && now.duration_since(mirror.timestamp) < self.shared.config.cache_timeout =>
            {
                debug!(user_id = %user_id, "permission set restored from mirror");
                self.install_set(&user_id, mirror.permissions);
                return;
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "permission mirror unavailable"),
        }

        match self.shared.source.load_permissions(&user_id).await {
            Ok(response) if response.success => match response.permissions {
                Some(permissions) => {
                    info!(user_id = %user_id, "permission set loaded");
                    let mirror = PermissionMirror {
                        permissions: permissions.clone(),
                        timestamp: now,
                        user_id: user_id.clone(),
                    };
                    if let Err(e) = self.shared.mirror.store(&mirror) {
                        debug!(error = %e, "failed to persist permission mirror");
                    }
                    self.install_set(&user_id, permissions);
                }
                None => warn!(user_id = %user_id, "permission load succeeded without payload"),
            },
            Ok(_) => warn!(user_id = %user_id, "permission load unsuccessful"),
            Err(e) => warn!(user_id = %user_id, error = %e, "permission load failed"),
        }
    }

    /// Decide "can edit element S": memoized entry, local evaluation, or
    /// per-selector remote check; deny when everything is unavailable
    pub async fn can_edit_element(&self, selector: &str) -> bool {
        let key = cache_key(selector);
        let now = self.shared.time_source.now();

        let user_id = {
            let mut state = self.lock_state();
            if let Some(value) = state.cache.get(&key, now) {
                return value;
            }
            if let Some(set) = &state.set {
                let value = set.can_edit_element(selector);
                state.cache.insert(key, value, now);
                return value;
            }
            state.user_id.clone()
        };

        // Unloaded: fall back to a single-selector remote check
        match self.shared.source.check_selector(&user_id, selector).await {
            Ok(response) if response.success => {
                let now = self.shared.time_source.now();
                self.lock_state().cache.insert(key, response.can_edit, now);
                response.can_edit
            }
            Ok(_) => {
                // Transient failure must not poison the cache
                debug!(selector, "selector check unsuccessful, denying");
                false
            }
            Err(e) => {
                warn!(selector, error = %e, "selector check failed, denying");
                false
            }
        }
    }

    /// Action-level check against the loaded set; deny if unloaded
    pub fn can_perform_action(&self, action: &str) -> bool {
        let state = self.lock_state();
        state
            .set
            .as_ref()
            .map(|set| set.can_perform(action))
            .unwrap_or(false)
    }

    /// Decide a whole collection of selectors concurrently
    ///
    /// Individual decisions interleave with other work; no ordering is
    /// guaranteed between them.
    pub async fn check_batch(&self, selectors: &[&str]) -> HashMap<String, bool> {
        let decisions = selectors.iter().map(|selector| async move {
            (selector.to_string(), self.can_edit_element(selector).await)
        });
        join_all(decisions).await.into_iter().collect()
    }

    /// Drop all cached decisions and the mirror, then reload
    pub async fn refresh(&self) {
        debug!("permission refresh requested");
        {
            let mut state = self.lock_state();
            state.cache.clear();
            state.set = None;
        }
        if let Err(e) = self.shared.mirror.clear() {
            debug!(error = %e, "failed to clear permission mirror");
        }
        self.load().await;
    }

    /// Switch to a new user: invalidate everything, then load for them
    pub async fn change_user(&self, user_id: UserId) {
        info!(user_id = %user_id, "user changed, reloading permissions");
        {
            let mut state = self.lock_state();
            state.user_id = user_id;
            state.cache.clear();
            state.set = None;
        }
        if let Err(e) = self.shared.mirror.clear() {
            debug!(error = %e, "failed to clear permission mirror");
        }
        self.load().await;
    }

    /// Housekeeping pass removing expired decisions
    ///
    /// Lookup already treats expired entries as absent; this reclaims them.
    pub fn sweep(&self) -> usize {
        let now = self.shared.time_source.now();
        let removed = self.lock_state().cache.sweep(now);
        if removed > 0 {
            debug!(removed, "swept expired permission decisions");
        }
        removed
    }

    /// Sweep period, mirroring the decision TTL
    pub fn sweep_interval(&self) -> std::time::Duration {
        self.shared.config.cache_timeout
    }

    /// Install a loaded set if the user has not changed mid-load, and emit
    /// the loaded event
    ///
    /// Deliberately leaves memoized decisions alone: only refresh,
    /// user-change, or TTL expiry invalidate them.
    fn install_set(&self, loaded_for: &UserId, permissions: PermissionSet) {
        {
            let mut state = self.lock_state();
            if &state.user_id != loaded_for {
                debug!("discarding permission set loaded for a previous user");
                return;
            }
            state.set = Some(permissions.clone());
        }
        let _ = self.shared.app_events.try_send(AppEvent::PermissionsLoaded {
            user_id: loaded_for.clone(),
            permissions,
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        // Poisoning cannot leave the cache logically corrupt; recover
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
