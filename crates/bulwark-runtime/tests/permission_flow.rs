//! End-to-end tests for the permission cache: load paths, the decision
//! protocol and its fallbacks, invalidation, and batch checks

mod test_utils;

use std::time::Duration;

use tokio::time::sleep;

use bulwark_core::{MirrorStorage, PermissionMirror, PermissionSet, Timestamp, UserId};
use bulwark_runtime::BrowserEvent;

use test_utils::{build_rig_from, rig_parts, toolbar_permissions, wait_permissions_loaded};

// ----------------------------------------------------------------------------
// Load Paths
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn loaded_set_serves_decisions_without_remote_checks() {
    let parts = rig_parts();
    parts.source.set_permissions(toolbar_permissions());
    let mut rig = build_rig_from(parts);

    let mut events = rig.runtime.take_app_events().unwrap();
    let (user_id, _) = wait_permissions_loaded(&mut events).await;
    assert_eq!(user_id, UserId::new("42"));
    assert_eq!(rig.source.load_calls(), 1);

    let permissions = rig.runtime.permissions();
    assert!(permissions.can_edit_element("#toolbar").await);
    assert!(permissions.can_edit_element("#toolbar .btn-save").await);
    assert!(!permissions.can_edit_element("#toolbar .btn-delete").await);
    assert!(!permissions.can_edit_element("#sidebar").await);

    // Every decision came from the loaded set
    assert_eq!(rig.source.check_calls(), 0);

    assert!(permissions.can_perform_action("save"));
    assert!(!permissions.can_perform_action("publish"));
}

#[tokio::test(start_paused = true)]
async fn successful_load_is_mirrored_to_persistent_storage() {
    let parts = rig_parts();
    parts.source.set_permissions(toolbar_permissions());
    let mut rig = build_rig_from(parts);

    let mut events = rig.runtime.take_app_events().unwrap();
    wait_permissions_loaded(&mut events).await;

    let mirror = rig.mirror_storage.load().unwrap().unwrap();
    assert_eq!(mirror.user_id, UserId::new("42"));
    assert_eq!(mirror.permissions, toolbar_permissions());
    assert_eq!(mirror.timestamp, Timestamp::new(1_000_000));
}

#[tokio::test(start_paused = true)]
async fn fresh_mirror_for_the_same_user_skips_the_remote_load() {
    let parts = rig_parts();
    parts
        .mirror_storage
        .store(&PermissionMirror {
            permissions: toolbar_permissions(),
            timestamp: Timestamp::new(1_000_000),
            user_id: UserId::new("42"),
        })
        .unwrap();
    let mut rig = build_rig_from(parts);

    let mut events = rig.runtime.take_app_events().unwrap();
    wait_permissions_loaded(&mut events).await;

    assert_eq!(rig.source.load_calls(), 0);
    assert!(rig.runtime.permissions().can_edit_element("#toolbar").await);
}

#[tokio::test(start_paused = true)]
async fn stale_or_foreign_mirrors_fall_through_to_the_remote_load() {
    // Stale: older than the testing TTL
    let parts = rig_parts();
    parts.source.set_permissions(toolbar_permissions());
    parts
        .mirror_storage
        .store(&PermissionMirror {
            permissions: toolbar_permissions(),
            timestamp: Timestamp::new(1_000_000 - 60),
            user_id: UserId::new("42"),
        })
        .unwrap();
    let mut rig = build_rig_from(parts);
    let mut events = rig.runtime.take_app_events().unwrap();
    wait_permissions_loaded(&mut events).await;
    assert_eq!(rig.source.load_calls(), 1);

    // Foreign: mirrored for a different user
    let parts = rig_parts();
    parts.source.set_permissions(toolbar_permissions());
    parts
        .mirror_storage
        .store(&PermissionMirror {
            permissions: toolbar_permissions(),
            timestamp: Timestamp::new(1_000_000),
            user_id: UserId::new("999"),
        })
        .unwrap();
    let mut rig = build_rig_from(parts);
    let mut events = rig.runtime.take_app_events().unwrap();
    wait_permissions_loaded(&mut events).await;
    assert_eq!(rig.source.load_calls(), 1);
}

// ----------------------------------------------------------------------------
// Decision Fallbacks
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn unloaded_set_falls_back_to_per_selector_checks_and_memoizes() {
    let parts = rig_parts();
    parts.source.set_load_error(true);
    parts.source.set_check_result(Some(true));
    let rig = build_rig_from(parts);
    sleep(Duration::from_millis(1)).await; // let the failed load settle

    let permissions = rig.runtime.permissions();
    assert!(permissions.can_edit_element("#widget").await);
    assert_eq!(rig.source.check_calls(), 1);

    // Fresh memoized decision, no second remote call
    assert!(permissions.can_edit_element("#widget").await);
    assert_eq!(rig.source.check_calls(), 1);

    // Past the testing TTL the entry expires and the check repeats
    rig.clock.advance(60);
    assert!(permissions.can_edit_element("#widget").await);
    assert_eq!(rig.source.check_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_remote_check_denies_without_poisoning_the_cache() {
    let parts = rig_parts();
    parts.source.set_load_error(true);
    parts.source.set_check_result(None);
    let rig = build_rig_from(parts);
    sleep(Duration::from_millis(1)).await;

    let permissions = rig.runtime.permissions();
    assert!(!permissions.can_edit_element("#widget").await);
    assert_eq!(rig.source.check_calls(), 1);

    // The denial was not memoized; a recovered backend is consulted again
    rig.source.set_check_result(Some(true));
    assert!(permissions.can_edit_element("#widget").await);
    assert_eq!(rig.source.check_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn action_checks_deny_while_the_set_is_unloaded() {
    let parts = rig_parts();
    parts.source.set_load_error(true);
    let rig = build_rig_from(parts);
    sleep(Duration::from_millis(1)).await;

    assert!(!rig.runtime.permissions().can_perform_action("save"));
}

#[tokio::test(start_paused = true)]
async fn memoized_decisions_survive_a_later_successful_load() {
    let parts = rig_parts();
    parts.source.set_load_error(true);
    parts.source.set_check_result(Some(true));
    let rig = build_rig_from(parts);
    sleep(Duration::from_millis(1)).await;

    let permissions = rig.runtime.permissions();
    assert!(permissions.can_edit_element("#widget").await);

    // The backend recovers with a set that would deny the same selector
    rig.source.set_load_error(false);
    rig.source.set_permissions(PermissionSet {
        can_edit: false,
        ..Default::default()
    });
    permissions.load().await;

    // Only TTL expiry, refresh, or a user change invalidate the entry
    assert!(permissions.can_edit_element("#widget").await);
    rig.clock.advance(60);
    assert!(!permissions.can_edit_element("#widget").await);
}

// ----------------------------------------------------------------------------
// Invalidation
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn permissions_changed_event_reloads_and_invalidates_decisions() {
    let parts = rig_parts();
    parts.source.set_permissions(toolbar_permissions());
    let mut rig = build_rig_from(parts);
    let mut events = rig.runtime.take_app_events().unwrap();
    wait_permissions_loaded(&mut events).await;

    assert!(rig.runtime.permissions().can_edit_element("#toolbar").await);

    rig.source.set_permissions(PermissionSet {
        can_edit: false,
        ..Default::default()
    });
    rig.runtime
        .browser_events()
        .send(BrowserEvent::PermissionsChanged)
        .await
        .unwrap();
    wait_permissions_loaded(&mut events).await;

    assert_eq!(rig.source.load_calls(), 2);
    assert!(!rig.runtime.permissions().can_edit_element("#toolbar").await);
}

#[tokio::test(start_paused = true)]
async fn user_change_drops_every_decision_and_loads_for_the_new_user() {
    let parts = rig_parts();
    parts.source.set_permissions(PermissionSet {
        can_edit: true,
        allowed_elements: vec!["*".into()],
        ..Default::default()
    });
    let mut rig = build_rig_from(parts);
    let mut events = rig.runtime.take_app_events().unwrap();
    wait_permissions_loaded(&mut events).await;

    assert!(rig.runtime.permissions().can_edit_element("#anything").await);

    rig.source.set_permissions(PermissionSet {
        can_edit: false,
        ..Default::default()
    });
    rig.runtime
        .browser_events()
        .send(BrowserEvent::UserChanged {
            user_id: UserId::new("99"),
        })
        .await
        .unwrap();
    let (user_id, _) = wait_permissions_loaded(&mut events).await;
    assert_eq!(user_id, UserId::new("99"));

    assert!(!rig.runtime.permissions().can_edit_element("#anything").await);
}

#[tokio::test(start_paused = true)]
async fn sweep_reclaims_expired_decisions() {
    let parts = rig_parts();
    parts.source.set_load_error(true);
    parts.source.set_check_result(Some(true));
    let rig = build_rig_from(parts);
    sleep(Duration::from_millis(1)).await;

    let permissions = rig.runtime.permissions();
    permissions.can_edit_element("#a").await;
    permissions.can_edit_element("#b").await;

    assert_eq!(permissions.sweep(), 0);
    rig.clock.advance(60);
    assert_eq!(permissions.sweep(), 2);
}

// ----------------------------------------------------------------------------
// Batch Checks
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn batch_checks_aggregate_individual_decisions() {
    let parts = rig_parts();
    parts.source.set_permissions(toolbar_permissions());
    let mut rig = build_rig_from(parts);
    let mut events = rig.runtime.take_app_events().unwrap();
    wait_permissions_loaded(&mut events).await;

    let decisions = rig
        .runtime
        .permissions()
        .check_batch(&["#toolbar", "#sidebar", "#toolbar .btn-delete"])
        .await;

    assert_eq!(decisions.len(), 3);
    assert!(decisions["#toolbar"]);
    assert!(!decisions["#sidebar"]);
    assert!(!decisions["#toolbar .btn-delete"]);
    assert_eq!(rig.source.check_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn batch_checks_fall_back_per_selector_when_unloaded() {
    let parts = rig_parts();
    parts.source.set_load_error(true);
    parts.source.set_check_result(Some(true));
    let rig = build_rig_from(parts);
    sleep(Duration::from_millis(1)).await;

    let decisions = rig
        .runtime
        .permissions()
        .check_batch(&["#a", "#b", "#c"])
        .await;

    assert!(decisions.values().all(|&allowed| allowed));
    assert_eq!(rig.source.check_calls(), 3);
}
