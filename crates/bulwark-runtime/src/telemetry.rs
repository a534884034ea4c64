//! Error telemetry task
//!
//! A single owned task holds the bounded queue and is the only writer to it.
//! Capture points (global handlers, the console mirror, the request
//! interceptor, manual reports) feed it over an mpsc channel; a periodic
//! timer, online transitions, and critical-error escalation trigger flushes.
//! Flushes are serialized by the snapshot-and-clear step: a flush started
//! while another is in flight sees an emptied queue and no-ops.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use bulwark_core::storage::SESSION_ID_KEY;
use bulwark_core::telemetry::Enrichment;
use bulwark_core::{
    Environment, ErrorBatch, ErrorKind, ErrorQueue, ErrorRecord, SessionId, SessionStorage,
    TelemetryConfig, TimeSource, Timestamp,
};

use crate::interceptor::RequestApi;
use crate::transport::{ErrorSink, TransportError};
use crate::{RuntimeError, Result};

// ----------------------------------------------------------------------------
// Failure Signals
// ----------------------------------------------------------------------------

/// A raw failure observed at one of the capture surfaces, before enrichment
#[derive(Debug, Clone)]
pub enum FailureSignal {
    /// Uncaught synchronous error
    Script {
        message: String,
        stack: Option<String>,
        filename: Option<String>,
        lineno: Option<u32>,
        colno: Option<u32>,
    },
    /// Uncaught promise rejection
    Rejection {
        reason: String,
        stack: Option<String>,
    },
    /// Error-level console output, mirrored (never suppressed)
    Console { message: String },
    /// Failed or timed-out outgoing request
    Request {
        api: RequestApi,
        method: String,
        status: Option<u16>,
        message: String,
        elapsed_ms: u64,
        timed_out: bool,
    },
    /// Explicit application report
    Manual { message: String },
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// Result of an explicit flush request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Number of records delivered to the sink
    pub sent: usize,
}

/// Commands accepted by the telemetry task
#[derive(Debug)]
pub enum TelemetryCommand {
    /// Normalize, enrich, and enqueue a failure
    Capture(FailureSignal),
    /// Connectivity flag update; transitioning online triggers a flush
    SetOnline(bool),
    /// Explicit flush, attempted even while offline
    Flush {
        reply: oneshot::Sender<core::result::Result<FlushOutcome, TransportError>>,
    },
    /// Stop the task
    Shutdown,
}

// ----------------------------------------------------------------------------
// Telemetry Task
// ----------------------------------------------------------------------------

/// Owner of the error queue and the flush loop
pub struct TelemetryTask<T: TimeSource> {
    config: TelemetryConfig,
    queue: ErrorQueue,
    online: bool,
    sink: Arc<dyn ErrorSink>,
    environment: Arc<dyn Environment>,
    session_id: SessionId,
    page_loaded_at: Timestamp,
    time_source: T,
    command_rx: mpsc::Receiver<TelemetryCommand>,
    running: bool,
}

impl<T: TimeSource> TelemetryTask<T> {
    /// Create the task, resolving the per-session id from session storage
    /// (or generating and persisting a fresh one)
    pub fn new(
        config: TelemetryConfig,
        sink: Arc<dyn ErrorSink>,
        environment: Arc<dyn Environment>,
        session_storage: Arc<dyn SessionStorage>,
        time_source: T,
        command_rx: mpsc::Receiver<TelemetryCommand>,
    ) -> Self {
        let session_id = resolve_session_id(session_storage.as_ref(), &time_source);
        let page_loaded_at = time_source.now();
        Self {
            queue: ErrorQueue::new(config.max_queue_size),
            config,
            online: true,
            sink,
            environment,
            session_id,
            page_loaded_at,
            time_source,
            command_rx,
            running: true,
        }
    }

    /// Run until the command channel closes or a shutdown arrives
    pub async fn run(&mut self) {
        info!(session_id = %self.session_id, "telemetry task starting");

        let period = self.config.flush_interval;
        let mut flush_timer =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        while self.running {
            tokio::select! {
                _ = flush_timer.tick() => {
                    // Periodic trigger is gated on the connectivity flag
                    if self.online && !self.queue.is_empty() {
                        if let Err(e) = self.flush().await {
                            warn!(error = %e, "periodic flush failed");
                        }
                    }
                }
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("telemetry command channel closed");
                        break;
                    }
                },
            }
        }

        info!("telemetry task stopped");
    }

    async fn handle_command(&mut self, command: TelemetryCommand) {
        match command {
            TelemetryCommand::Capture(signal) => {
                let record = self.enrich(signal);
                let critical = record.is_critical();
                let evicted = self.queue.push(record);
                if evicted > 0 {
                    debug!(evicted, "queue bound exceeded, dropped oldest records");
                }
                if critical {
                    // Escalation bypasses the connectivity gate; a failed
                    // attempt lands back in the queue like any other
                    warn!("critical error captured, flushing immediately");
                    if let Err(e) = self.flush().await {
                        warn!(error = %e, "critical flush failed, batch restored");
                    }
                }
            }

            TelemetryCommand::SetOnline(online) => {
                let was_online = self.online;
                self.online = online;
                if online && !was_online {
                    debug!("connectivity restored, flushing queue");
                    if let Err(e) = self.flush().await {
                        warn!(error = %e, "reconnection flush failed");
                    }
                }
            }

            TelemetryCommand::Flush { reply } => {
                let outcome = self.flush().await;
                let _ = reply.send(outcome);
            }

            TelemetryCommand::Shutdown => {
                info!("telemetry shutdown requested");
                self.running = false;
            }
        }
    }

    /// Snapshot-and-clear the queue, send one batch, restore on failure
    async fn flush(&mut self) -> core::result::Result<FlushOutcome, TransportError> {
        if self.queue.is_empty() {
            return Ok(FlushOutcome { sent: 0 });
        }

        let batch = ErrorBatch::new(self.queue.take_batch(), self.time_source.now());
        let count = batch.len();

        match self.sink.submit_batch(&batch).await {
            Ok(()) => {
                debug!(count, "error batch delivered");
                Ok(FlushOutcome { sent: count })
            }
            Err(e) => {
                // Full snapshot back at the head, ahead of anything captured
                // during the attempt; the bound may evict the oldest restored
                let evicted = self.queue.restore_batch(batch.errors);
                if evicted > 0 {
                    debug!(evicted, "restore exceeded queue bound");
                }
                Err(e)
            }
        }
    }

    /// Normalize a failure signal into an enriched record
    fn enrich(&self, signal: FailureSignal) -> ErrorRecord {
        let now = self.time_source.now();
        let page = self.environment.page();
        let enrichment = Enrichment {
            session_id: self.session_id.clone(),
            page_load_time_ms: now - self.page_loaded_at,
            memory_usage: self.environment.memory_usage(),
            connection_type: self.environment.connection_type(),
        };
        let timestamp_ms = now.as_millis();

        match signal {
            FailureSignal::Script {
                message,
                stack,
                filename,
                lineno,
                colno,
            } => ErrorRecord::new(ErrorKind::JavascriptError, message, page, enrichment, timestamp_ms)
                .with_stack(stack)
                .with_script_location(filename, lineno, colno),

            FailureSignal::Rejection { reason, stack } => {
                ErrorRecord::new(ErrorKind::PromiseRejection, reason, page, enrichment, timestamp_ms)
                    .with_stack(stack)
            }

            FailureSignal::Console { message } => {
                ErrorRecord::new(ErrorKind::ConsoleError, message, page, enrichment, timestamp_ms)
            }

            FailureSignal::Request {
                api,
                method,
                status,
                message,
                elapsed_ms,
                timed_out,
            } => {
                let kind = match (api, timed_out) {
                    (RequestApi::Ajax, true) => ErrorKind::AjaxTimeout,
                    (RequestApi::Ajax, false) => ErrorKind::AjaxError,
                    (RequestApi::Fetch, _) => ErrorKind::FetchError,
                };
                ErrorRecord::new(kind, message, page, enrichment, timestamp_ms)
                    .with_request(method, status, elapsed_ms)
            }

            FailureSignal::Manual { message } => {
                ErrorRecord::new(ErrorKind::ManualReport, message, page, enrichment, timestamp_ms)
            }
        }
    }
}

/// Load the session id from session storage or generate and persist one
///
/// Storage failures degrade to a fresh in-memory id; they never block capture.
fn resolve_session_id<T: TimeSource>(storage: &dyn SessionStorage, time_source: &T) -> SessionId {
    match storage.get(SESSION_ID_KEY) {
        Ok(Some(existing)) if !existing.is_empty() => SessionId::from(existing),
        Ok(_) => {
            let fresh = SessionId::generate(time_source);
            if let Err(e) = storage.set(SESSION_ID_KEY, fresh.as_str()) {
                debug!(error = %e, "failed to persist session id");
            }
            fresh
        }
        Err(e) => {
            debug!(error = %e, "session storage unavailable, using ephemeral id");
            SessionId::generate(time_source)
        }
    }
}

// ----------------------------------------------------------------------------
// Telemetry Handle
// ----------------------------------------------------------------------------

/// Cloneable handle for feeding the telemetry task
#[derive(Debug, Clone)]
pub struct TelemetryHandle {
    sender: mpsc::Sender<TelemetryCommand>,
}

impl TelemetryHandle {
    pub fn new(sender: mpsc::Sender<TelemetryCommand>) -> Self {
        Self { sender }
    }

    /// Capture a failure signal
    pub async fn capture(&self, signal: FailureSignal) -> Result<()> {
        self.sender
            .send(TelemetryCommand::Capture(signal))
            .await
            .map_err(|_| RuntimeError::ChannelClosed {
                context: "telemetry capture".into(),
            })
    }

    /// Capture without waiting; drops the signal when the channel is full
    ///
    /// Used by decorators on hot paths: telemetry is best-effort and must
    /// never block or fail the wrapped operation.
    pub fn try_capture(&self, signal: FailureSignal) {
        if let Err(e) = self.sender.try_send(TelemetryCommand::Capture(signal)) {
            debug!(error = %e, "telemetry capture dropped");
        }
    }

    /// Report an application-level error message
    pub async fn report(&self, message: impl Into<String>) -> Result<()> {
        self.capture(FailureSignal::Manual {
            message: message.into(),
        })
        .await
    }

    /// Update the connectivity flag
    pub async fn set_online(&self, online: bool) -> Result<()> {
        self.sender
            .send(TelemetryCommand::SetOnline(online))
            .await
            .map_err(|_| RuntimeError::ChannelClosed {
                context: "telemetry set_online".into(),
            })
    }

    /// Flush now, regardless of the connectivity flag
    pub async fn flush_now(&self) -> Result<FlushOutcome> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(TelemetryCommand::Flush { reply })
            .await
            .map_err(|_| RuntimeError::ChannelClosed {
                context: "telemetry flush".into(),
            })?;
        rx.await
            .map_err(|_| RuntimeError::ChannelClosed {
                context: "telemetry flush reply".into(),
            })?
            .map_err(RuntimeError::Transport)
    }

    /// Ask the task to stop
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(TelemetryCommand::Shutdown)
            .await
            .map_err(|_| RuntimeError::ChannelClosed {
                context: "telemetry shutdown".into(),
            })
    }
}
