//! Flags shared by the supervisor loop, both relays and the signal handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Run-wide coordination state.
///
/// Every writer only ever sets a flag to its terminal value, except the
/// supervisor which clears `restart_requested` at the start of each launch.
#[derive(Debug)]
pub struct Coordination {
    restart_requested: AtomicBool,
    killed: AtomicBool,
    live_relays: AtomicUsize,
}

impl Coordination {
    /// Fresh state for a run. A restart is pending so the first launch happens.
    pub const fn new() -> Self {
        Self {
            restart_requested: AtomicBool::new(true),
            killed: AtomicBool::new(false),
            live_relays: AtomicUsize::new(0),
        }
    }

    /// Ask for one relaunch once the current server exits.
    pub fn request_restart(&self) {
        self.restart_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::SeqCst)
    }

    /// Clear a pending restart, returning whether one was pending.
    pub fn take_restart_request(&self) -> bool {
        self.restart_requested.swap(false, Ordering::SeqCst)
    }

    /// Record a termination request. Returns `true` only for the first call.
    ///
    /// Never cleared within a run.
    pub fn kill(&self) -> bool {
        !self.killed.swap(true, Ordering::SeqCst)
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Number of relay tasks that have not finished yet.
    pub fn live_relays(&self) -> usize {
        self.live_relays.load(Ordering::SeqCst)
    }

    /// Register a running relay; it counts as live until the guard drops.
    pub fn enter_relay(self: &Arc<Self>) -> RelayGuard {
        self.live_relays.fetch_add(1, Ordering::SeqCst);
        RelayGuard {
            coordination: Arc::clone(self),
        }
    }
}

impl Default for Coordination {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a relay counted in [`Coordination::live_relays`].
#[derive(Debug)]
pub struct RelayGuard {
    coordination: Arc<Coordination>,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        self.coordination.live_relays.fetch_sub(1, Ordering::SeqCst);
    }
}
