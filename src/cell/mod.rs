//! State cells: atomic containers for one store's state.
//!
//! A cell owns a single value of type `T`, applies transforms to it one
//! at a time, and broadcasts every committed state on a snapshot
//! stream. Two implementations exist:
//!
//! - [`FileCell`]: file-backed with crash-safe replace-by-rename
//! - [`MemoryCell`]: in-process only, for tests and transient caches
//!
//! Stores wrap `Arc<dyn StateCell<_>>`, so the persistent and in-memory
//! variants share one surface.

mod file;
mod memory;

pub use file::FileCell;
pub use memory::MemoryCell;

use async_trait::async_trait;

use crate::error::Result;
use crate::stream::SnapshotStream;

/// A state transform handed to [`StateCell::update`]. Receives the
/// current state and returns the full replacement state.
pub type Transform<T> = Box<dyn FnOnce(&T) -> T + Send + 'static>;

/// Atomic container for one store's state.
///
/// Transforms are totally ordered per cell; the snapshot stream emits
/// states in commit order. There is no ordering across cells.
#[async_trait]
pub trait StateCell<T>: Send + Sync + 'static
where
    T: Clone + Send + Sync + 'static,
{
    /// The current state, loading it from the backing storage on first
    /// access.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be reached.
    /// Decode failures are not errors: the cell adopts the codec's
    /// default and logs.
    async fn load(&self) -> Result<T>;

    /// Atomically replace the state with `transform(current)` and
    /// return the new state.
    ///
    /// Once the replacement has begun it runs to completion even if the
    /// caller is cancelled: the persisted bytes, the in-memory cache,
    /// and the snapshot broadcast always move together.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`](crate::StoreError::Write) if the
    /// replacement fails; the previous state remains visible and no
    /// snapshot is emitted.
    async fn update(&self, transform: Transform<T>) -> Result<T>;

    /// Subscribe to committed snapshots. The stream immediately yields
    /// the current state, then every subsequent committed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial state cannot be loaded.
    async fn subscribe(&self) -> Result<SnapshotStream<T>>;
}
