//! Observability sink for the sync agent.
//!
//! The agent never logs directly; it reports [`Diagnostic`]s to an injected
//! [`DiagnosticSink`]. Production code uses [`TracingSink`], tests use
//! [`MemorySink`] and assert on what was reported.

use std::sync::Mutex;
use tracing::{debug, warn};

use super::error::SyncError;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// `initialize()` could not load the file; state was left untouched.
    LoadFailed { error: SyncError },
    /// A remote update arrived while the input guard was active.
    UpdateSuppressed { filepath: String },
    /// An event name the agent does not handle.
    UnknownEvent { name: String },
    /// A known event whose payload did not decode.
    MalformedEvent { name: String, error: String },
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::LoadFailed { error } => {
                warn!("[agent] Failed to load file: {}", error);
            }
            Diagnostic::UpdateSuppressed { filepath } => {
                debug!("[agent] Input in progress, ignoring update for {}", filepath);
            }
            Diagnostic::UnknownEvent { name } => {
                debug!("[agent] Ignoring event {}", name);
            }
            Diagnostic::MalformedEvent { name, error } => {
                warn!("[agent] Malformed {} event: {}", name, error);
            }
        }
    }
}

/// Records diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic);
    }
}
