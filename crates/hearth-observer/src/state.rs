//! Shared application state for the observer API.

use hearth_core::CommandQueue;
use hearth_db::ReadStore;

/// Everything a handler needs: the read-only store and the engine's
/// command queue.
pub struct AppState {
    /// Read-only storage access (WAL MVCC; never blocks the writer).
    pub read: ReadStore,
    /// Commands to apply before the next tick.
    pub commands: CommandQueue,
}

impl AppState {
    /// Assemble the state from its two handles.
    pub const fn new(read: ReadStore, commands: CommandQueue) -> Self {
        Self { read, commands }
    }
}
