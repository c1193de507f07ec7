//! Typed preference store backed by a state cell.

use std::sync::Arc;

use tracing::debug;

use super::editor::Editor;
use crate::cell::{FileCell, MemoryCell, StateCell};
use crate::codec::{JsonCodec, PrefState};
use crate::crypto::{Encryptor, Passthrough};
use crate::error::Result;
use crate::paths::{BaseDirProvider, PathProvider};
use crate::registry;
use crate::stream::DerivedStream;
use crate::value::{text_as_bool, text_as_f32, text_as_i32, text_as_i64};

/// Typed key-value store persisted as one canonical-JSON file.
///
/// Getters return the caller's default for absent keys and for stored
/// text that fails to parse as the requested kind; they never error for
/// those cases. All mutations go through [`edit`](Self::edit) and
/// commit atomically.
///
/// # Thread Safety
///
/// `PreferenceStore` is `Clone` and can be shared across tasks. Every
/// clone opened for the same name observes the same underlying cell.
#[derive(Clone)]
pub struct PreferenceStore {
    cell: Arc<dyn StateCell<PrefState>>,
    name: String,
}

impl PreferenceStore {
    /// Start building a persistent store with the given name.
    pub fn builder(name: impl Into<String>) -> PreferenceStoreBuilder {
        PreferenceStoreBuilder {
            name: name.into(),
            provider: None,
            encryptor: Arc::new(Passthrough),
        }
    }

    /// Create a non-persistent store with the identical contract.
    /// Ideal for tests and transient caches; data is lost on drop.
    pub fn in_memory() -> Self {
        Self {
            cell: Arc::new(MemoryCell::<PrefState>::default()),
            name: "<memory>".to_string(),
        }
    }

    pub(crate) fn from_cell(cell: Arc<dyn StateCell<PrefState>>, name: String) -> Self {
        Self { cell, name }
    }

    /// The store's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored text for `key`, or `default` when absent.
    pub async fn get_string(&self, key: &str, default: &str) -> Result<String> {
        let state = self.cell.load().await?;
        Ok(state
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string()))
    }

    /// The stored value parsed as `i32`, or `default` when absent or
    /// unparseable.
    pub async fn get_i32(&self, key: &str, default: i32) -> Result<i32> {
        let state = self.cell.load().await?;
        Ok(state.get(key).map_or(default, |t| text_as_i32(t, default)))
    }

    /// The stored value parsed as `i64`, or `default` when absent or
    /// unparseable.
    pub async fn get_i64(&self, key: &str, default: i64) -> Result<i64> {
        let state = self.cell.load().await?;
        Ok(state.get(key).map_or(default, |t| text_as_i64(t, default)))
    }

    /// The stored value parsed as `f32`, or `default` when absent or
    /// unparseable.
    pub async fn get_f32(&self, key: &str, default: f32) -> Result<f32> {
        let state = self.cell.load().await?;
        Ok(state.get(key).map_or(default, |t| text_as_f32(t, default)))
    }

    /// The stored value parsed as `bool` (strict `true`/`false`,
    /// case-insensitive), or `default` otherwise.
    pub async fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        let state = self.cell.load().await?;
        Ok(state.get(key).map_or(default, |t| text_as_bool(t, default)))
    }

    /// Snapshot of the whole store as stored text.
    pub async fn get_all(&self) -> Result<PrefState> {
        self.cell.load().await
    }

    /// Whether `key` is present. Membership is over the raw map; the
    /// TTL store's `contains` additionally requires liveness.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        let state = self.cell.load().await?;
        Ok(state.contains_key(key))
    }

    /// Create a single-use editor for a batched atomic commit.
    pub fn edit(&self) -> Editor {
        Editor::new(Arc::clone(&self.cell), self.name.clone())
    }

    /// Stream of the whole store, emitting on every state change.
    pub async fn watch_all(&self) -> Result<DerivedStream<PrefState, PrefState>> {
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(Clone::clone))
    }

    /// Stream of the interpreted string value for `key`. Emits the
    /// current value immediately, then once per change of the
    /// interpreted value; commits that leave it unchanged are filtered.
    pub async fn watch_string(
        &self,
        key: &str,
        default: &str,
    ) -> Result<DerivedStream<PrefState, String>> {
        let (key, default) = (key.to_string(), default.to_string());
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| {
            state.get(&key).cloned().unwrap_or_else(|| default.clone())
        }))
    }

    /// Stream of the interpreted `i32` value for `key`.
    pub async fn watch_i32(
        &self,
        key: &str,
        default: i32,
    ) -> Result<DerivedStream<PrefState, i32>> {
        let key = key.to_string();
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| state.get(&key).map_or(default, |t| text_as_i32(t, default))))
    }

    /// Stream of the interpreted `i64` value for `key`.
    pub async fn watch_i64(
        &self,
        key: &str,
        default: i64,
    ) -> Result<DerivedStream<PrefState, i64>> {
        let key = key.to_string();
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| state.get(&key).map_or(default, |t| text_as_i64(t, default))))
    }

    /// Stream of the interpreted `f32` value for `key`.
    pub async fn watch_f32(
        &self,
        key: &str,
        default: f32,
    ) -> Result<DerivedStream<PrefState, f32>> {
        let key = key.to_string();
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| state.get(&key).map_or(default, |t| text_as_f32(t, default))))
    }

    /// Stream of the interpreted `bool` value for `key`.
    pub async fn watch_bool(
        &self,
        key: &str,
        default: bool,
    ) -> Result<DerivedStream<PrefState, bool>> {
        let key = key.to_string();
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| state.get(&key).map_or(default, |t| text_as_bool(t, default))))
    }
}

/// Builder for a persistent [`PreferenceStore`].
pub struct PreferenceStoreBuilder {
    name: String,
    provider: Option<Box<dyn PathProvider>>,
    encryptor: Arc<dyn Encryptor>,
}

impl PreferenceStoreBuilder {
    /// Root the store file under the given directory instead of the
    /// default documents directory.
    pub fn base_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.provider = Some(Box::new(BaseDirProvider::new(dir)));
        self
    }

    /// Resolve the store file through a custom provider.
    pub fn path_provider(mut self, provider: impl PathProvider) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Encrypt persisted bytes with the given encryptor. The first open
    /// of a name fixes its encryptor for the process lifetime.
    pub fn encryptor(mut self, encryptor: impl Encryptor) -> Self {
        self.encryptor = Arc::new(encryptor);
        self
    }

    /// Resolve the path and open the store, reusing the process-wide
    /// cell if this name is already open.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or no base directory can
    /// be resolved. The file itself is only touched on first access.
    pub fn open(self) -> Result<PreferenceStore> {
        let path = match &self.provider {
            Some(provider) => provider.resolve(&self.name)?,
            None => BaseDirProvider::documents()?.resolve(&self.name)?,
        };

        let name = self.name.clone();
        let encryptor = Arc::clone(&self.encryptor);
        let cell = registry::preference_cells().obtain(path.clone(), || {
            debug!(store = %name, path = %path.display(), "Opening preference store");
            FileCell::new(
                name.clone(),
                path.clone(),
                JsonCodec::<PrefState>::new(),
                encryptor,
            )
        });

        Ok(PreferenceStore::from_cell(cell, self.name))
    }
}
