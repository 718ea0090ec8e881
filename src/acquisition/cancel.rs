//! Shared cancellation signal polled once per sampling tick

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    Running,
    CancelRequested,
    Stopped,
}

/// Tri-state flag shared between a task and whoever wants to stop it.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    state: Arc<Mutex<CancelState>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CancelState::Running)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> CancelState {
        *self.lock()
    }

    /// Move `Running` to `CancelRequested`. Returns false if the task was
    /// already asked to stop or has stopped.
    pub fn request_cancel(&self) -> bool {
        let mut state = self.lock();
        if *state == CancelState::Running {
            *state = CancelState::CancelRequested;
            true
        } else {
            false
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        *self.lock() != CancelState::Running
    }

    pub fn mark_stopped(&self) {
        *self.lock() = CancelState::Stopped;
    }
}
