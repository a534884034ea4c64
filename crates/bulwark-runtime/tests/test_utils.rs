//! Shared mocks and rig construction for the runtime integration tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use bulwark_core::{
    ChannelConfig, ErrorBatch, ErrorRecord, ManualTimeSource, MemoryStorage, PageEnvironment,
    PermissionCheckResponse, PermissionConfig, PermissionLoadResponse, PermissionSet,
    StaticEnvironment, TelemetryConfig, UserId, Viewport,
};
use bulwark_runtime::{
    AppEvent, ClientRuntime, ErrorSink, PermissionSource, RuntimeBuilder, TransportError,
};

// ----------------------------------------------------------------------------
// Mock Error Sink
// ----------------------------------------------------------------------------

/// Sink recording delivered batches, with programmable failures and an
/// optional gate that holds sends in flight until notified
#[derive(Default)]
pub struct MockSink {
    batches: Mutex<Vec<Vec<ErrorRecord>>>,
    failures_remaining: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` submissions with a network error
    pub fn fail_times(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Hold every submission at the given gate until it is notified
    pub fn set_gate(&self, gate: Arc<Notify>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn clear_gate(&self) {
        *self.gate.lock().unwrap() = None;
    }

    /// Batches delivered so far, oldest first
    pub fn batches(&self) -> Vec<Vec<ErrorRecord>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// Messages of every delivered record, flattened in delivery order
    pub fn delivered_messages(&self) -> Vec<String> {
        self.batches()
            .into_iter()
            .flatten()
            .map(|r| r.message)
            .collect()
    }
}

#[async_trait]
impl ErrorSink for MockSink {
    async fn submit_batch(&self, batch: &ErrorBatch) -> Result<(), TransportError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failures_remaining.load(Ordering::SeqCst) > 0 {
            self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(TransportError::Network {
                reason: "mock sink unavailable".into(),
            });
        }
        self.batches.lock().unwrap().push(batch.errors.clone());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Mock Permission Source
// ----------------------------------------------------------------------------

/// Permission source with programmable payloads and call counting
#[derive(Default)]
pub struct MockSource {
    load_calls: AtomicUsize,
    check_calls: AtomicUsize,
    permissions: Mutex<Option<PermissionSet>>,
    load_error: AtomicBool,
    check_result: Mutex<Option<bool>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to loads with this set (success path)
    pub fn set_permissions(&self, permissions: PermissionSet) {
        *self.permissions.lock().unwrap() = Some(permissions);
    }

    /// Respond to loads with `success: false`
    pub fn clear_permissions(&self) {
        *self.permissions.lock().unwrap() = None;
    }

    /// Make loads fail at the transport level
    pub fn set_load_error(&self, fail: bool) {
        self.load_error.store(fail, Ordering::SeqCst);
    }

    /// Respond to selector checks with this decision; `None` fails the call
    pub fn set_check_result(&self, result: Option<bool>) {
        *self.check_result.lock().unwrap() = result;
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionSource for MockSource {
    async fn load_permissions(
        &self,
        _user_id: &UserId,
    ) -> Result<PermissionLoadResponse, TransportError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.load_error.load(Ordering::SeqCst) {
            return Err(TransportError::Network {
                reason: "mock source unavailable".into(),
            });
        }
        let permissions = self.permissions.lock().unwrap().clone();
        Ok(PermissionLoadResponse {
            success: permissions.is_some(),
            permissions,
        })
    }

    async fn check_selector(
        &self,
        _user_id: &UserId,
        _selector: &str,
    ) -> Result<PermissionCheckResponse, TransportError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        match *self.check_result.lock().unwrap() {
            Some(can_edit) => Ok(PermissionCheckResponse {
                success: true,
                can_edit,
            }),
            None => Err(TransportError::Network {
                reason: "mock check unavailable".into(),
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Test Rig
// ----------------------------------------------------------------------------

/// Pre-build handles, for tests that seed mocks or storage before the
/// runtime spawns its initial permission load
pub struct RigParts {
    pub sink: Arc<MockSink>,
    pub source: Arc<MockSource>,
    pub clock: ManualTimeSource,
    pub session_storage: Arc<MemoryStorage>,
    pub mirror_storage: Arc<MemoryStorage>,
}

pub fn rig_parts() -> RigParts {
    RigParts {
        sink: Arc::new(MockSink::new()),
        source: Arc::new(MockSource::new()),
        clock: ManualTimeSource::new(1_000_000),
        session_storage: Arc::new(MemoryStorage::new()),
        mirror_storage: Arc::new(MemoryStorage::new()),
    }
}

/// A built runtime plus handles to everything the tests poke at
pub struct TestRig {
    pub runtime: ClientRuntime<ManualTimeSource>,
    pub sink: Arc<MockSink>,
    pub source: Arc<MockSource>,
    pub clock: ManualTimeSource,
    pub session_storage: Arc<MemoryStorage>,
    pub mirror_storage: Arc<MemoryStorage>,
}

/// Page context every rig record should carry
pub fn rig_page() -> PageEnvironment {
    PageEnvironment {
        url: "https://admin.example.test/settings".into(),
        user_agent: "RigAgent/1.0".into(),
        viewport: Viewport {
            width: 1280,
            height: 800,
            scroll_x: 0,
            scroll_y: 0,
        },
        screen: Default::default(),
    }
}

/// Build a runtime on testing configs with a manual clock
pub fn build_rig() -> TestRig {
    build_rig_from(rig_parts())
}

pub fn build_rig_from(parts: RigParts) -> TestRig {
    let RigParts {
        sink,
        source,
        clock,
        session_storage,
        mirror_storage,
    } = parts;

    let runtime = RuntimeBuilder::new()
        .with_telemetry_config(TelemetryConfig::testing())
        .with_permission_config(PermissionConfig::testing())
        .with_channel_config(ChannelConfig::testing())
        .with_user_id(UserId::new("42"))
        .with_error_sink(sink.clone())
        .with_permission_source(source.clone())
        .with_session_storage(session_storage.clone())
        .with_mirror_storage(mirror_storage.clone())
        .with_environment(Arc::new(StaticEnvironment {
            page: rig_page(),
            memory: None,
            connection: Some("4g".into()),
        }))
        .with_time_source(clock.clone())
        .build()
        .unwrap();

    TestRig {
        runtime,
        sink,
        source,
        clock,
        session_storage,
        mirror_storage,
    }
}

/// Wait for the next successful permission load, with a safety timeout
pub async fn wait_permissions_loaded(
    events: &mut tokio::sync::mpsc::Receiver<AppEvent>,
) -> (UserId, PermissionSet) {
    match tokio::time::timeout(std::time::Duration::from_secs(5), events.recv()).await {
        Ok(Some(AppEvent::PermissionsLoaded {
            user_id,
            permissions,
        })) => (user_id, permissions),
        other => panic!("expected a permissions-loaded event, got {other:?}"),
    }
}

/// Toolbar permission set used by the matching tests
pub fn toolbar_permissions() -> PermissionSet {
    PermissionSet {
        can_edit: true,
        allowed_elements: vec!["#toolbar".into()],
        element_overrides: std::collections::HashMap::from([(
            "#toolbar .btn-delete".to_string(),
            false,
        )]),
        actions: std::collections::HashMap::from([(
            "can_save".to_string(),
            serde_json::Value::Bool(true),
        )]),
    }
}
