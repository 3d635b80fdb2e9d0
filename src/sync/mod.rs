//! Client side of the file sync protocol.
//!
//! A [`SyncAgent`] caches the tracked file and talks to the backend through a
//! [`FileTransport`]; an [`UpdateChannel`] feeds it push notifications while
//! the backend runs in development mode.

pub mod agent;
pub mod channel;
pub mod diagnostics;
pub mod error;
pub mod guard;
pub mod observable;
pub mod transport;

pub use agent::{RemoteUpdate, SyncAgent, DEFAULT_INPUT_DEBOUNCE};
pub use channel::{ChannelConfig, ChannelHandle, ChannelState, UpdateChannel};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use error::{ChannelError, SyncError};
pub use guard::{InputGuard, InputHold};
pub use observable::Observable;
pub use transport::{FileTransport, HttpTransport};
