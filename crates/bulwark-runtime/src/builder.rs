//! Runtime construction and wiring
//!
//! The original installed itself as page-level globals on load; here the
//! same lifecycle is explicit: the builder takes the host's injected
//! capabilities, spawns the telemetry task, the permission load, the sweep
//! loop, and the browser-event dispatcher, and returns the handles the host
//! glue keeps for the page lifetime.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use bulwark_core::{
    ChannelConfig, Environment, MemoryStorage, MirrorStorage, PermissionConfig, SessionStorage,
    StaticEnvironment, SystemTimeSource, TelemetryConfig, TimeSource, UserId,
};

use crate::events::{AppEvent, BrowserEvent};
use crate::permissions::PermissionManager;
use crate::telemetry::{FailureSignal, TelemetryHandle, TelemetryTask};
use crate::transport::{ErrorSink, PermissionSource};
use crate::{Result, RuntimeError};

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

/// Builder wiring both components to the host's capabilities
pub struct RuntimeBuilder<T: TimeSource = SystemTimeSource> {
    telemetry_config: TelemetryConfig,
    permission_config: PermissionConfig,
    channel_config: ChannelConfig,
    user_id: Option<UserId>,
    sink: Option<Arc<dyn ErrorSink>>,
    source: Option<Arc<dyn PermissionSource>>,
    session_storage: Option<Arc<dyn SessionStorage>>,
    mirror_storage: Option<Arc<dyn MirrorStorage>>,
    environment: Option<Arc<dyn Environment>>,
    time_source: T,
}

impl RuntimeBuilder<SystemTimeSource> {
    pub fn new() -> Self {
        Self {
            telemetry_config: TelemetryConfig::default(),
            permission_config: PermissionConfig::default(),
            channel_config: ChannelConfig::default(),
            user_id: None,
            sink: None,
            source: None,
            session_storage: None,
            mirror_storage: None,
            environment: None,
            time_source: SystemTimeSource::new(),
        }
    }
}

impl Default for RuntimeBuilder<SystemTimeSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RuntimeBuilder<T>
where
    T: TimeSource + Clone + Send + Sync + 'static,
{
    pub fn with_telemetry_config(mut self, config: TelemetryConfig) -> Self {
        self.telemetry_config = config;
        self
    }

    pub fn with_permission_config(mut self, config: PermissionConfig) -> Self {
        self.permission_config = config;
        self
    }

    pub fn with_channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Set the user whose permissions are resolved (required)
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the remote sink for error batches (required)
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the remote permission source (required)
    pub fn with_permission_source(mut self, source: Arc<dyn PermissionSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_session_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.session_storage = Some(storage);
        self
    }

    pub fn with_mirror_storage(mut self, storage: Arc<dyn MirrorStorage>) -> Self {
        self.mirror_storage = Some(storage);
        self
    }

    pub fn with_environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Replace the time source (tests use a manually advanced one)
    pub fn with_time_source<T2>(self, time_source: T2) -> RuntimeBuilder<T2>
    where
        T2: TimeSource + Clone + Send + Sync + 'static,
    {
        RuntimeBuilder {
            telemetry_config: self.telemetry_config,
            permission_config: self.permission_config,
            channel_config: self.channel_config,
            user_id: self.user_id,
            sink: self.sink,
            source: self.source,
            session_storage: self.session_storage,
            mirror_storage: self.mirror_storage,
            environment: self.environment,
            time_source,
        }
    }

    /// Validate, wire, and spawn everything
    pub fn build(self) -> Result<ClientRuntime<T>> {
        self.telemetry_config.validate().map_err(RuntimeError::Core)?;
        self.permission_config.validate().map_err(RuntimeError::Core)?;

        let user_id = self
            .user_id
            .ok_or(RuntimeError::MissingDependency { name: "user_id" })?;
        let sink = self
            .sink
            .ok_or(RuntimeError::MissingDependency { name: "error_sink" })?;
        let source = self.source.ok_or(RuntimeError::MissingDependency {
            name: "permission_source",
        })?;
        let session_storage = self
            .session_storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let mirror_storage = self
            .mirror_storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let environment = self
            .environment
            .unwrap_or_else(|| Arc::new(StaticEnvironment::default()));

        let (command_tx, command_rx) = mpsc::channel(self.channel_config.command_buffer_size);
        let (browser_tx, browser_rx) =
            mpsc::channel(self.channel_config.browser_event_buffer_size);
        let (app_tx, app_rx) = mpsc::channel(self.channel_config.app_event_buffer_size);

        // Telemetry: one owned task, fed over the command channel
        let mut telemetry_task = TelemetryTask::new(
            self.telemetry_config,
            sink,
            environment,
            session_storage,
            self.time_source.clone(),
            command_rx,
        );
        let telemetry = TelemetryHandle::new(command_tx);
        let telemetry_join = tokio::spawn(async move { telemetry_task.run().await });

        // Permissions: shared manager; construction begins the async load
        let permissions = PermissionManager::new(
            self.permission_config,
            user_id,
            source,
            mirror_storage,
            app_tx,
            self.time_source,
        );
        let loader = permissions.clone();
        let load_join = tokio::spawn(async move { loader.load().await });

        let sweeper = permissions.clone();
        let sweep_join = tokio::spawn(async move {
            let period = sweeper.sweep_interval();
            let mut timer =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                timer.tick().await;
                sweeper.sweep();
            }
        });

        let dispatch_join = tokio::spawn(dispatch_browser_events(
            browser_rx,
            telemetry.clone(),
            permissions.clone(),
        ));

        Ok(ClientRuntime {
            telemetry,
            permissions,
            browser_events: browser_tx,
            app_events: Some(app_rx),
            telemetry_join,
            background: vec![load_join, sweep_join, dispatch_join],
        })
    }
}

// ----------------------------------------------------------------------------
// Browser Event Dispatcher
// ----------------------------------------------------------------------------

/// Fan browser events out to the component that owns them
async fn dispatch_browser_events<T>(
    mut browser_rx: mpsc::Receiver<BrowserEvent>,
    telemetry: TelemetryHandle,
    permissions: PermissionManager<T>,
) where
    T: TimeSource,
{
    while let Some(event) = browser_rx.recv().await {
        match event {
            BrowserEvent::UncaughtError {
                message,
                stack,
                filename,
                lineno,
                colno,
            } => {
                let _ = telemetry
                    .capture(FailureSignal::Script {
                        message,
                        stack,
                        filename,
                        lineno,
                        colno,
                    })
                    .await;
            }
            BrowserEvent::UnhandledRejection { reason, stack } => {
                let _ = telemetry
                    .capture(FailureSignal::Rejection { reason, stack })
                    .await;
            }
            BrowserEvent::Online => {
                let _ = telemetry.set_online(true).await;
            }
            BrowserEvent::Offline => {
                let _ = telemetry.set_online(false).await;
            }
            BrowserEvent::PermissionsChanged => {
                permissions.refresh().await;
            }
            BrowserEvent::UserChanged { user_id } => {
                permissions.change_user(user_id).await;
            }
        }
    }
    debug!("browser event channel closed, dispatcher stopping");
}

// ----------------------------------------------------------------------------
// Client Runtime
// ----------------------------------------------------------------------------

/// The running resiliency layer: handles plus its background tasks
///
/// Tasks run for the page lifetime; there is no teardown requirement beyond
/// it, but [`ClientRuntime::shutdown`] stops everything deliberately.
pub struct ClientRuntime<T: TimeSource> {
    telemetry: TelemetryHandle,
    permissions: PermissionManager<T>,
    browser_events: mpsc::Sender<BrowserEvent>,
    app_events: Option<mpsc::Receiver<AppEvent>>,
    telemetry_join: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl<T: TimeSource> std::fmt::Debug for ClientRuntime<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRuntime").finish_non_exhaustive()
    }
}

impl<T: TimeSource> ClientRuntime<T> {
    /// Handle for capturing and flushing errors
    pub fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// Handle for permission decisions
    pub fn permissions(&self) -> &PermissionManager<T> {
        &self.permissions
    }

    /// Sender the host glue pushes browser events into
    pub fn browser_events(&self) -> mpsc::Sender<BrowserEvent> {
        self.browser_events.clone()
    }

    /// Take the app-event receiver (first caller wins)
    pub fn take_app_events(&mut self) -> Option<mpsc::Receiver<AppEvent>> {
        self.app_events.take()
    }

    /// Stop the telemetry task and abort the periodic loops
    pub async fn shutdown(self) {
        let _ = self.telemetry.shutdown().await;
        let _ = self.telemetry_join.await;
        for task in self.background {
            task.abort();
        }
    }
}
