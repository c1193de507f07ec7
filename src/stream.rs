//! Snapshot streams over committed state.
//!
//! Cells broadcast every committed snapshot on a `tokio::sync::watch`
//! channel: the latest value is cached, new subscribers replay it
//! immediately, and a subscriber that lags only ever observes the most
//! recent state (intermediate snapshots coalesce away).
//!
//! Per-key streams are derived by projecting each snapshot and
//! filtering consecutive duplicates of the *projected* value, so a
//! commit that does not change the key a subscriber watches produces no
//! emission for it.

use tokio::sync::watch;

/// Hot stream of committed snapshots.
///
/// The first call to [`next`](Self::next) yields the state current at
/// subscription time; subsequent calls wait for newer commits. `None`
/// means the owning cell was dropped.
pub struct SnapshotStream<T> {
    rx: watch::Receiver<T>,
    primed: bool,
}

impl<T: Clone> SnapshotStream<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx, primed: false }
    }

    /// The latest committed state, without waiting.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot.
    ///
    /// Snapshots arrive in commit order; if several commits land while
    /// the subscriber is busy, only the latest is observed.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Derive a stream that projects each snapshot and drops
    /// consecutive duplicates of the projected value.
    pub fn project<U, F>(self, project: F) -> DerivedStream<T, U>
    where
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        DerivedStream {
            source: self,
            project: Box::new(project),
            last: None,
        }
    }
}

/// Stream derived from a [`SnapshotStream`] by projection, with
/// last-value de-duplication.
pub struct DerivedStream<T, U> {
    source: SnapshotStream<T>,
    project: Box<dyn Fn(&T) -> U + Send + Sync>,
    last: Option<U>,
}

impl<T, U> DerivedStream<T, U>
where
    T: Clone,
    U: Clone + PartialEq,
{
    /// The projection of the latest committed state.
    pub fn current(&self) -> U {
        (self.project)(&self.source.current())
    }

    /// Wait for the next distinct projected value.
    ///
    /// The first call yields the projection of the state current at
    /// subscription time. `None` means the owning cell was dropped.
    pub async fn next(&mut self) -> Option<U> {
        loop {
            let state = self.source.next().await?;
            let value = (self.project)(&state);
            if self.last.as_ref() != Some(&value) {
                self.last = Some(value.clone());
                return Some(value);
            }
        }
    }
}
