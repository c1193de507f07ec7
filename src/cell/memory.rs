//! In-process state cell without persistence.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::{StateCell, Transform};
use crate::error::Result;
use crate::stream::SnapshotStream;

/// Non-persistent cell with the same contract as
/// [`FileCell`](super::FileCell). State lives in process memory and is
/// lost on drop. Intended for tests and transient caches.
pub struct MemoryCell<T> {
    state: Mutex<T>,
    snapshots: watch::Sender<T>,
}

impl<T> MemoryCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell holding the given initial state.
    pub fn new(initial: T) -> Self {
        let (snapshots, _) = watch::channel(initial.clone());
        Self {
            state: Mutex::new(initial),
            snapshots,
        }
    }
}

impl<T> Default for MemoryCell<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[async_trait]
impl<T> StateCell<T> for MemoryCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn load(&self) -> Result<T> {
        Ok(self.state.lock().clone())
    }

    async fn update(&self, transform: Transform<T>) -> Result<T> {
        let mut state = self.state.lock();
        let next = transform(&state);
        *state = next.clone();
        self.snapshots.send_replace(next.clone());
        Ok(next)
    }

    async fn subscribe(&self) -> Result<SnapshotStream<T>> {
        Ok(SnapshotStream::new(self.snapshots.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PrefState;

    #[tokio::test]
    async fn update_is_visible_to_load_and_stream() {
        let cell = MemoryCell::<PrefState>::default();
        let mut stream = cell.subscribe().await.unwrap();
        assert!(stream.next().await.unwrap().is_empty());

        cell.update(Box::new(|state| {
            let mut next = state.clone();
            next.insert("k".to_string(), "v".to_string());
            next
        }))
        .await
        .unwrap();

        assert_eq!(cell.load().await.unwrap().len(), 1);
        let state = stream.next().await.unwrap();
        assert_eq!(state.get("k").map(String::as_str), Some("v"));
    }
}
