//! Signal/slot mechanism for model observation.
//!
//! Signals are how an outline model tells its views that something
//! happened. A view connects a slot (closure) to each signal it cares
//! about and the model emits them at well-defined points around every
//! mutation.
//!
//! All invocation is direct: the slot runs on the emitting thread before
//! `emit` returns. The model is built for single-threaded cooperative
//! use, so there is no queued/cross-thread delivery here; a host that
//! needs that wraps the slot itself.
//!
//! # Example
//!
//! ```
//! use arbor_outline_core::Signal;
//!
//! let rows_added = Signal::<Vec<u64>>::new();
//! let guard = rows_added.connect_guarded(|rows| {
//!     assert!(!rows.is_empty());
//! });
//! rows_added.emit(vec![1, 2, 3]);
//! drop(guard); // disconnects
//! assert_eq!(rows_added.connection_count(), 0);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};
use tracing::trace;

use crate::logging::targets;

new_key_type! {
    /// Unique identifier for a signal-slot connection.
    ///
    /// Returned by [`Signal::connect`]; pass it to [`Signal::disconnect`]
    /// to remove the slot. Stale ids are harmless; disconnecting twice
    /// simply returns `false`.
    pub struct ConnectionId;
}

/// A slot registered on a signal.
struct Connection<Args> {
    slot: Arc<dyn Fn(&Args) + Send + Sync>,
}

/// A signal that invokes its connected slots when emitted.
///
/// Cloning a `Signal` produces another handle to the same connection
/// set; emitting through either handle invokes the same slots.
pub struct Signal<Args> {
    connections: Arc<Mutex<SlotMap<ConnectionId, Connection<Args>>>>,
}

impl<Args> Clone for Signal<Args> {
    fn clone(&self) -> Self {
        Self {
            connections: Arc::clone(&self.connections),
        }
    }
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Creates a signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Connects a slot and returns its connection id.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connections.lock().insert(Connection {
            slot: Arc::new(slot),
        });
        trace!(target: targets::CORE, ?id, "slot connected");
        id
    }

    /// Connects a slot and returns a guard that disconnects it on drop.
    pub fn connect_guarded<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            signal: self.clone(),
            id: Some(id),
        }
    }

    /// Removes a connection. Returns `false` if the id was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.connections.lock().remove(id).is_some();
        if removed {
            trace!(target: targets::CORE, ?id, "slot disconnected");
        }
        removed
    }

    /// Removes every connection.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of currently connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Invokes every connected slot with `args`.
    ///
    /// Slots run outside the internal lock, so a slot may connect or
    /// disconnect (including itself) while the emission is in flight;
    /// such changes take effect for the *next* emission.
    pub fn emit(&self, args: Args) {
        let slots: Vec<Arc<dyn Fn(&Args) + Send + Sync>> = self
            .connections
            .lock()
            .values()
            .map(|conn| Arc::clone(&conn.slot))
            .collect();
        for slot in slots {
            slot(&args);
        }
    }
}

/// RAII guard that disconnects a slot when dropped.
///
/// Obtained from [`Signal::connect_guarded`]. Call [`release`] to keep
/// the connection alive past the guard.
///
/// [`release`]: ConnectionGuard::release
pub struct ConnectionGuard<Args> {
    signal: Signal<Args>,
    id: Option<ConnectionId>,
}

impl<Args> ConnectionGuard<Args> {
    /// Detaches the guard, leaving the connection in place permanently.
    pub fn release(mut self) -> ConnectionId {
        self.id.take().expect("guard already released")
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.signal.disconnect(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_invokes_slots() {
        let signal = Signal::<i32>::new();
        let sum = Arc::new(Mutex::new(0));

        let s1 = sum.clone();
        signal.connect(move |value| *s1.lock() += value);
        let s2 = sum.clone();
        signal.connect(move |value| *s2.lock() += value * 10);

        signal.emit(3);
        assert_eq!(*sum.lock(), 33);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let count = Arc::new(Mutex::new(0));

        let c = count.clone();
        let id = signal.connect(move |_| *c.lock() += 1);
        signal.emit(());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(());

        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_guard_disconnects_on_drop() {
        let signal = Signal::<()>::new();
        {
            let _guard = signal.connect_guarded(|_| {});
            assert_eq!(signal.connection_count(), 1);
        }
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_may_disconnect_during_emit() {
        let signal = Signal::<()>::new();
        let other = signal.clone();
        let id_cell = Arc::new(Mutex::new(None::<ConnectionId>));

        let cell = id_cell.clone();
        let id = signal.connect(move |_| {
            if let Some(id) = cell.lock().take() {
                other.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(());
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_clone_shares_connections() {
        let signal = Signal::<i32>::new();
        let twin = signal.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        signal.connect(move |value| s.lock().push(*value));
        twin.emit(7);

        assert_eq!(*seen.lock(), vec![7]);
    }
}
