//! Batched mutation editor for preference stores.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::cell::StateCell;
use crate::codec::PrefState;
use crate::error::{Result, StoreError};
use crate::value::Value;

/// Single-use builder of one atomic commit.
///
/// Mutations accumulate in call order; readers only ever observe the
/// aggregated result of [`commit`](Self::commit). An editor is consumed
/// by its commit: any mutation or second commit afterwards fails with
/// [`StoreError::InvalidState`]. Editors are not meant to be shared
/// across tasks.
pub struct Editor {
    cell: Arc<dyn StateCell<PrefState>>,
    name: String,
    state: Mutex<EditorState>,
}

enum EditorState {
    Open(Batch),
    Committing,
    Committed,
    Failed,
}

impl EditorState {
    fn describe(&self) -> &'static str {
        match self {
            Self::Open(_) => "open",
            Self::Committing => "commit in progress",
            Self::Committed => "already committed",
            Self::Failed => "commit failed",
        }
    }
}

/// Accumulated mutations: a pending clear, removals, and additions.
#[derive(Default)]
pub(crate) struct Batch {
    clear_all: bool,
    removals: BTreeSet<String>,
    additions: BTreeMap<String, String>,
}

impl Batch {
    pub(crate) fn put(&mut self, key: String, text: String) {
        self.removals.remove(&key);
        self.additions.insert(key, text);
    }

    pub(crate) fn remove(&mut self, key: String) {
        self.additions.remove(&key);
        self.removals.insert(key);
    }

    pub(crate) fn clear(&mut self) {
        self.clear_all = true;
        self.removals.clear();
        self.additions.clear();
    }

    /// Apply the batch to a state snapshot: clear, then removals, then
    /// additions.
    pub(crate) fn apply(self, state: &PrefState) -> PrefState {
        let mut next = if self.clear_all {
            PrefState::new()
        } else {
            state.clone()
        };
        for key in &self.removals {
            next.remove(key);
        }
        next.extend(self.additions);
        next
    }
}

impl Editor {
    pub(crate) fn new(cell: Arc<dyn StateCell<PrefState>>, name: String) -> Self {
        Self {
            cell,
            name,
            state: Mutex::new(EditorState::Open(Batch::default())),
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut Batch)) -> Result<&Self> {
        let mut state = self.state.lock();
        match &mut *state {
            EditorState::Open(batch) => {
                f(batch);
                Ok(self)
            }
            other => Err(StoreError::invalid_state(other.describe())),
        }
    }

    /// Stage a typed value under `key`.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::InvalidName`] for an empty key, or
    /// [`StoreError::InvalidState`] once the editor has committed.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<&Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::invalid_name(key));
        }
        let text = value.into().render();
        self.mutate(move |batch| batch.put(key, text))
    }

    /// Stage a string value.
    pub fn put_string(&self, key: impl Into<String>, value: impl Into<String>) -> Result<&Self> {
        self.put(key, value.into())
    }

    /// Stage an `i32` value.
    pub fn put_i32(&self, key: impl Into<String>, value: i32) -> Result<&Self> {
        self.put(key, value)
    }

    /// Stage an `i64` value.
    pub fn put_i64(&self, key: impl Into<String>, value: i64) -> Result<&Self> {
        self.put(key, value)
    }

    /// Stage an `f32` value.
    pub fn put_f32(&self, key: impl Into<String>, value: f32) -> Result<&Self> {
        self.put(key, value)
    }

    /// Stage a `bool` value.
    pub fn put_bool(&self, key: impl Into<String>, value: bool) -> Result<&Self> {
        self.put(key, value)
    }

    /// Stage the removal of `key`. Removing an absent key is a no-op at
    /// commit time.
    pub fn remove(&self, key: impl Into<String>) -> Result<&Self> {
        let key = key.into();
        self.mutate(move |batch| batch.remove(key))
    }

    /// Stage a clear of the whole store. Puts staged after the clear
    /// still apply.
    pub fn clear(&self) -> Result<&Self> {
        self.mutate(Batch::clear)
    }

    /// Atomically apply the accumulated batch to the store.
    ///
    /// Produces exactly one new state and one snapshot emission. On
    /// failure nothing persists, the editor enters its terminal failed
    /// state, and the error surfaces to the caller.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidState`] if the editor was already committed
    /// or a commit is in flight; [`StoreError::Write`] if the file
    /// replacement fails.
    pub async fn commit(&self) -> Result<()> {
        let batch = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, EditorState::Committing) {
                EditorState::Open(batch) => batch,
                other => {
                    let err = StoreError::invalid_state(other.describe());
                    *state = other;
                    return Err(err);
                }
            }
        };

        let result = self
            .cell
            .update(Box::new(move |state| batch.apply(state)))
            .await;

        let mut state = self.state.lock();
        match result {
            Ok(_) => {
                *state = EditorState::Committed;
                Ok(())
            }
            Err(e) => {
                *state = EditorState::Failed;
                error!(store = %self.name, error = %e, "Commit failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    fn state_of(pairs: &[(&str, &str)]) -> PrefState {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn apply_order_is_clear_removals_additions() {
        let mut batch = Batch::default();
        batch.put("kept".to_string(), "new".to_string());
        batch.remove("gone".to_string());

        let state = state_of(&[("gone", "1"), ("other", "2")]);
        let next = batch.apply(&state);

        assert_eq!(next, state_of(&[("kept", "new"), ("other", "2")]));
    }

    #[test]
    fn put_cancels_pending_removal() {
        let mut batch = Batch::default();
        batch.remove("k".to_string());
        batch.put("k".to_string(), "v".to_string());

        let next = batch.apply(&PrefState::new());
        assert_eq!(next, state_of(&[("k", "v")]));
    }

    #[test]
    fn remove_cancels_pending_put() {
        let mut batch = Batch::default();
        batch.put("k".to_string(), "v".to_string());
        batch.remove("k".to_string());

        let next = batch.apply(&state_of(&[("k", "old")]));
        assert!(next.is_empty());
    }

    #[test]
    fn clear_drops_existing_state_but_keeps_later_puts() {
        let mut batch = Batch::default();
        batch.put("early".to_string(), "1".to_string());
        batch.clear();
        batch.put("late".to_string(), "2".to_string());

        let next = batch.apply(&state_of(&[("old", "x")]));
        assert_eq!(next, state_of(&[("late", "2")]));
    }
}
