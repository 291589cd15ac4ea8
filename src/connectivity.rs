//! Best-effort network availability checks.
//!
//! The client consults its [`Connectivity`] once, when it is built. Requests
//! submitted later are never gated on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reports whether a network currently appears to be available.
pub trait Connectivity: Send + Sync {
    /// Returns `true` if requests have a chance of reaching the network.
    fn is_online(&self) -> bool;
}

/// Always reports a network. Used when no other check is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Shared online flag, updated by the host from its platform network callbacks.
///
/// # Examples
///
/// ```
/// use callqueue::{Connectivity, NetworkState};
///
/// let state = NetworkState::new(true);
/// let handle = state.clone();
///
/// handle.set_online(false);
/// assert!(!state.is_online());
/// ```
#[derive(Debug, Clone)]
pub struct NetworkState {
    online: Arc<AtomicBool>,
}

impl NetworkState {
    /// Creates a state with the given initial value.
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    /// Records a connectivity change.
    pub fn set_online(&self, online: bool) {
        tracing::debug!(online, "Network state changed");
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for NetworkState {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

impl<F> Connectivity for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_online(&self) -> bool {
        self()
    }
}
