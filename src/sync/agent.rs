//! Client-side owner of the cached file state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use super::error::SyncError;
use super::guard::InputGuard;
use super::observable::Observable;
use super::transport::{FileTransport, HttpTransport};
use crate::config::SyncConfig;
use crate::events::{ChannelEvent, UpdateEvent};
use crate::file::FileRecord;

/// Quiet period after the last keystroke before remote updates apply again.
pub const DEFAULT_INPUT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Outcome of [`SyncAgent::on_remote_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteUpdate {
    /// The snapshot replaced the local pair.
    Applied,
    /// The snapshot equals the local pair; readers were not notified.
    Unchanged,
    /// Dropped because the input guard was active.
    Suppressed,
}

/// Client sync agent.
///
/// Caches one `(filepath, raw)` pair, loads it with [`initialize`], pushes
/// edits with [`submit_edit`] and applies snapshots from the push channel via
/// [`on_remote_update`]. The pair is stored in a single [`Observable`] so the
/// two fields always change together.
///
/// Constructing an agent performs no I/O.
///
/// [`initialize`]: SyncAgent::initialize
/// [`submit_edit`]: SyncAgent::submit_edit
/// [`on_remote_update`]: SyncAgent::on_remote_update
pub struct SyncAgent {
    transport: Arc<dyn FileTransport>,
    state: Observable<FileRecord>,
    guard: InputGuard,
    input_debounce: Duration,
    sink: Arc<dyn DiagnosticSink>,
}

impl SyncAgent {
    pub fn new(
        transport: Arc<dyn FileTransport>,
        guard: InputGuard,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            transport,
            state: Observable::default(),
            guard,
            input_debounce: DEFAULT_INPUT_DEBOUNCE,
            sink,
        }
    }

    /// Agent with a fresh guard that reports through `tracing`.
    pub fn with_transport(transport: Arc<dyn FileTransport>) -> Self {
        Self::new(transport, InputGuard::new(), Arc::new(TracingSink))
    }

    /// HTTP agent for the configured server, with the configured request
    /// timeout and input debounce.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let transport = match config.request_timeout() {
            Some(timeout) => HttpTransport::with_timeout(config.file_url(), timeout)?,
            None => HttpTransport::new(config.file_url()),
        };
        Ok(Self::with_transport(Arc::new(transport))
            .with_input_debounce(config.input_debounce()))
    }

    pub fn with_input_debounce(mut self, window: Duration) -> Self {
        self.input_debounce = window;
        self
    }

    pub fn input_debounce(&self) -> Duration {
        self.input_debounce
    }

    /// Record local typing: remote updates are suppressed until the input
    /// debounce window passes without another call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mark_input(&self) {
        self.guard.touch(self.input_debounce);
    }

    /// Load the tracked file from the backend.
    ///
    /// On success the pair is replaced and returned. On failure the previous
    /// state is kept and a [`Diagnostic::LoadFailed`] is reported; the error
    /// is handed back for callers that care, but the agent remains usable.
    pub async fn initialize(&self) -> Result<FileRecord, SyncError> {
        match self.transport.read().await {
            Ok(record) => {
                self.state.set(record.clone());
                Ok(record)
            }
            Err(error) => {
                self.sink.report(Diagnostic::LoadFailed {
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Send new content to the backend.
    ///
    /// Local state is not touched: the caller already shows what it typed.
    /// Failures are returned, never retried.
    pub async fn submit_edit(&self, raw: &str) -> Result<(), SyncError> {
        self.transport.write(raw).await
    }

    /// Apply a snapshot pushed by the backend unless the user is typing.
    pub fn on_remote_update(&self, event: &UpdateEvent) -> RemoteUpdate {
        if self.guard.is_active() {
            self.sink.report(Diagnostic::UpdateSuppressed {
                filepath: event.filepath.clone(),
            });
            return RemoteUpdate::Suppressed;
        }

        if self.state.set_if_changed(FileRecord::from(event.clone())) {
            RemoteUpdate::Applied
        } else {
            RemoteUpdate::Unchanged
        }
    }

    /// Dispatch a decoded channel event. Only file updates affect state.
    pub fn handle_event(&self, event: &ChannelEvent) -> Option<RemoteUpdate> {
        match event {
            ChannelEvent::UpdateFile(update) => Some(self.on_remote_update(update)),
            ChannelEvent::UpdateSlide(_) | ChannelEvent::UpdateNote(_) => None,
            ChannelEvent::Unknown { name, .. } => {
                self.sink.report(Diagnostic::UnknownEvent { name: name.clone() });
                None
            }
        }
    }

    /// Decode a raw channel message and dispatch it. Malformed payloads are
    /// reported and otherwise ignored.
    pub fn handle_message(&self, name: &str, data: &str) -> Option<RemoteUpdate> {
        match ChannelEvent::decode(name, data) {
            Ok(event) => self.handle_event(&event),
            Err(e) => {
                self.sink.report(Diagnostic::MalformedEvent {
                    name: e.name.clone(),
                    error: e.source.to_string(),
                });
                None
            }
        }
    }

    pub fn filepath(&self) -> String {
        self.state.with(|r| r.filepath.clone())
    }

    pub fn raw(&self) -> String {
        self.state.with(|r| r.raw.clone())
    }

    /// Both fields, read together.
    pub fn snapshot(&self) -> FileRecord {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<FileRecord> {
        self.state.subscribe()
    }

    pub fn guard(&self) -> &InputGuard {
        &self.guard
    }
}
