//! Batched mutation editor for the TTL store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::error;

use super::entry::TtlEntry;
use super::manager::TtlManager;
use crate::cell::StateCell;
use crate::codec::TtlState;
use crate::crypto::{Encryptor, seal_text};
use crate::error::{Result, StoreError};
use crate::value::Value;

/// Single-use batch editor for a [`TtlStore`](super::TtlStore).
///
/// Identical state machine to the preference [`Editor`](crate::Editor),
/// except each put may carry an optional lifetime. The expiry instant
/// is computed at commit time, not at staging time, so a batch that
/// sits around before committing does not lose lifetime.
pub struct TtlEditor {
    cell: Arc<dyn StateCell<TtlState>>,
    manager: Arc<TtlManager>,
    encryptor: Arc<dyn Encryptor>,
    encrypt_values: bool,
    name: String,
    state: Mutex<EditorState>,
}

enum EditorState {
    Open(TtlBatch),
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

/// A staged put: rendered text plus the requested lifetime.
struct StagedPut {
    text: String,
    ttl: Option<Duration>,
}

#[derive(Default)]
struct TtlBatch {
    clear_all: bool,
    removals: BTreeSet<String>,
    additions: BTreeMap<String, StagedPut>,
}

impl TtlEditor {
    pub(crate) fn new(
        cell: Arc<dyn StateCell<TtlState>>,
        manager: Arc<TtlManager>,
        encryptor: Arc<dyn Encryptor>,
        encrypt_values: bool,
        name: String,
    ) -> Self {
        Self {
            cell,
            manager,
            encryptor,
            encrypt_values,
            name,
            state: Mutex::new(EditorState::Open(TtlBatch::default())),
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut TtlBatch)) -> Result<&Self> {
        let mut state = self.state.lock();
        match &mut *state {
            EditorState::Open(batch) => {
                f(batch);
                Ok(self)
            }
            other => Err(StoreError::invalid_state(other.describe())),
        }
    }

    /// Stage a typed value with an optional lifetime. `None` falls back
    /// to the store's default TTL; with neither, the entry never
    /// expires.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::InvalidName`] for an empty key, or
    /// [`StoreError::InvalidState`] once the editor has committed.
    pub fn put(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        ttl: Option<Duration>,
    ) -> Result<&Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::invalid_name(key));
        }
        let text = value.into().render();
        self.mutate(move |batch| {
            batch.removals.remove(&key);
            batch.additions.insert(key, StagedPut { text, ttl });
        })
    }

    /// Stage a string value.
    pub fn put_string(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Result<&Self> {
        self.put(key, value.into(), ttl)
    }

    /// Stage an `i32` value.
    pub fn put_i32(&self, key: impl Into<String>, value: i32, ttl: Option<Duration>) -> Result<&Self> {
        self.put(key, value, ttl)
    }

    /// Stage an `i64` value.
    pub fn put_i64(&self, key: impl Into<String>, value: i64, ttl: Option<Duration>) -> Result<&Self> {
        self.put(key, value, ttl)
    }

    /// Stage an `f32` value.
    pub fn put_f32(&self, key: impl Into<String>, value: f32, ttl: Option<Duration>) -> Result<&Self> {
        self.put(key, value, ttl)
    }

    /// Stage a `bool` value.
    pub fn put_bool(
        &self,
        key: impl Into<String>,
        value: bool,
        ttl: Option<Duration>,
    ) -> Result<&Self> {
        self.put(key, value, ttl)
    }

    /// Stage the removal of `key`.
    pub fn remove(&self, key: impl Into<String>) -> Result<&Self> {
        let key = key.into();
        self.mutate(move |batch| {
            batch.additions.remove(&key);
            batch.removals.insert(key);
        })
    }

    /// Stage a clear of the whole store.
    pub fn clear(&self) -> Result<&Self> {
        self.mutate(|batch| {
            batch.clear_all = true;
            batch.removals.clear();
            batch.additions.clear();
        })
    }

    /// Atomically apply the batch. Expiry instants are computed now,
    /// from each put's lifetime or the store default; values are
    /// encrypted now if the store is configured for it.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidState`] if already committed or a commit is
    /// in flight; [`StoreError::Encrypt`] if value encryption fails
    /// (nothing persists); [`StoreError::Write`] if the file
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

        let result = self.apply(batch).await;

        let mut state = self.state.lock();
        match result {
            Ok(()) => {
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

    async fn apply(&self, batch: TtlBatch) -> Result<()> {
        // Seal values before entering the transform: encryption is
        // fallible and the transform is not.
        let mut entries = BTreeMap::new();
        for (key, put) in batch.additions {
            let (value, encrypted) = if self.encrypt_values {
                (seal_text(self.encryptor.as_ref(), &put.text)?, true)
            } else {
                (put.text, false)
            };
            let entry = TtlEntry {
                key: key.clone(),
                value,
                duration: put.ttl,
                expires_at: self.manager.expiration_for(put.ttl),
                encrypted,
            };
            entries.insert(key, entry);
        }

        let clear_all = batch.clear_all;
        let removals = batch.removals;
        self.cell
            .update(Box::new(move |state| {
                let mut next = if clear_all {
                    TtlState::new()
                } else {
                    state.clone()
                };
                for key in &removals {
                    next.remove(key);
                }
                next.extend(entries);
                next
            }))
            .await?;
        Ok(())
    }
}
