//! The input guard: "the user is editing, don't overwrite local content".
//!
//! A guard is an explicit handle shared between the editor that sets it and
//! the [`SyncAgent`](super::SyncAgent) that consults it before applying a
//! remote update. Clones share state; independent guards do not.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct GuardState {
    /// Set and cleared explicitly by the owner
    manual: AtomicBool,
    /// Outstanding [`InputHold`]s
    holds: AtomicUsize,
    /// A debounce window from [`InputGuard::touch`] is open
    debouncing: AtomicBool,
    /// Bumped on every touch so only the latest timer clears the window
    debounce_generation: AtomicU64,
}

/// Shared flag suppressing remote content updates while active.
///
/// The guard is active when any of these holds: it was set with
/// [`InputGuard::set_active`], an [`InputHold`] is alive, or a
/// [`InputGuard::touch`] debounce window has not yet elapsed.
#[derive(Debug, Clone, Default)]
pub struct InputGuard {
    state: Arc<GuardState>,
}

impl InputGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.state.manual.load(Ordering::Acquire)
            || self.state.holds.load(Ordering::Acquire) > 0
            || self.state.debouncing.load(Ordering::Acquire)
    }

    /// Set or clear the flag. Clearing also closes any open debounce window;
    /// live holds keep the guard active.
    pub fn set_active(&self, active: bool) {
        self.state.manual.store(active, Ordering::Release);
        if !active {
            self.state.debounce_generation.fetch_add(1, Ordering::AcqRel);
            self.state.debouncing.store(false, Ordering::Release);
        }
    }

    /// Keep the guard active until the returned hold is dropped, e.g. for the
    /// duration of an edit round-trip.
    pub fn hold(&self) -> InputHold {
        self.state.holds.fetch_add(1, Ordering::AcqRel);
        InputHold {
            state: self.state.clone(),
        }
    }

    /// Mark a keystroke: the guard stays active until `window` passes without
    /// another touch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn touch(&self, window: Duration) {
        let generation = self.state.debounce_generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.debouncing.store(true, Ordering::Release);

        let state = self.state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if state.debounce_generation.load(Ordering::Acquire) == generation {
                state.debouncing.store(false, Ordering::Release);
            }
        });
    }
}

/// RAII hold on an [`InputGuard`].
#[derive(Debug)]
pub struct InputHold {
    state: Arc<GuardState>,
}

impl Drop for InputHold {
    fn drop(&mut self) {
        self.state.holds.fetch_sub(1, Ordering::AcqRel);
    }
}
