//! TTL-enabled key-value store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::cleanup::CleanupJob;
use super::editor::TtlEditor;
use super::entry::TtlEntry;
use super::manager::{Clock, SystemClock, TtlManager};
use crate::cell::{FileCell, MemoryCell, StateCell};
use crate::codec::{JsonCodec, TtlState};
use crate::crypto::{Encryptor, Passthrough, open_text};
use crate::error::Result;
use crate::paths::{BaseDirProvider, PathProvider};
use crate::registry;
use crate::stream::DerivedStream;
use crate::value::{text_as_bool, text_as_f32, text_as_i32, text_as_i64};

/// Key-value store whose entries expire.
///
/// Expired entries are treated as absent everywhere, but the three
/// cleanup mechanisms differ in when they are physically removed:
///
/// - **lazily, never on single-key reads**: a getter that hits an
///   expired entry returns the default and leaves the file untouched,
///   so read-heavy workloads pay no write amplification;
/// - **in batch on [`get_all`](Self::get_all)**: every expired entry
///   encountered is removed with at most one state update;
/// - **periodically** via [`cleanup_job`](Self::cleanup_job).
#[derive(Clone)]
pub struct TtlStore {
    cell: Arc<dyn StateCell<TtlState>>,
    manager: Arc<TtlManager>,
    encryptor: Arc<dyn Encryptor>,
    encrypt_values: bool,
    name: String,
}

impl TtlStore {
    /// Start building a store with the given name.
    pub fn builder(name: impl Into<String>) -> TtlStoreBuilder {
        TtlStoreBuilder {
            name: name.into(),
            provider: None,
            encryptor: Arc::new(Passthrough),
            default_ttl: None,
            clock: Arc::new(SystemClock),
            encrypt_values: false,
        }
    }

    /// The store's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored text for `key`, or `default` when the key is absent
    /// or expired. Never writes: an expired entry stays on disk until
    /// the next batch or periodic cleanup.
    pub async fn get_string(&self, key: &str, default: &str) -> Result<String> {
        let state = self.cell.load().await?;
        Ok(self
            .live_text(&state, key)
            .unwrap_or_else(|| default.to_string()))
    }

    /// The stored value parsed as `i32`; `default` when absent,
    /// expired, or unparseable.
    pub async fn get_i32(&self, key: &str, default: i32) -> Result<i32> {
        let state = self.cell.load().await?;
        Ok(self
            .live_text(&state, key)
            .map_or(default, |t| text_as_i32(&t, default)))
    }

    /// The stored value parsed as `i64`.
    pub async fn get_i64(&self, key: &str, default: i64) -> Result<i64> {
        let state = self.cell.load().await?;
        Ok(self
            .live_text(&state, key)
            .map_or(default, |t| text_as_i64(&t, default)))
    }

    /// The stored value parsed as `f32`.
    pub async fn get_f32(&self, key: &str, default: f32) -> Result<f32> {
        let state = self.cell.load().await?;
        Ok(self
            .live_text(&state, key)
            .map_or(default, |t| text_as_f32(&t, default)))
    }

    /// The stored value parsed as `bool`.
    pub async fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        let state = self.cell.load().await?;
        Ok(self
            .live_text(&state, key)
            .map_or(default, |t| text_as_bool(&t, default)))
    }

    /// All live entries as text, physically removing every expired
    /// entry encountered with at most one state update.
    pub async fn get_all(&self) -> Result<BTreeMap<String, String>> {
        let state = self.cell.load().await?;
        let expired = self.expired_keys(&state);

        let state = if expired.is_empty() {
            state
        } else {
            debug!(store = %self.name, expired = expired.len(), "Removing expired entries");
            self.remove_keys(expired).await?
        };

        Ok(state
            .values()
            .filter(|entry| !self.manager.is_entry_expired(entry))
            .map(|entry| (entry.key.clone(), self.reveal(entry)))
            .collect())
    }

    /// Whether `key` exists **and** has not expired. Note the contrast
    /// with the non-TTL store, whose `contains` is raw membership.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        let state = self.cell.load().await?;
        Ok(state
            .get(key)
            .is_some_and(|entry| !self.manager.is_entry_expired(entry)))
    }

    /// Create a single-use editor for a batched atomic commit.
    pub fn edit(&self) -> TtlEditor {
        TtlEditor::new(
            Arc::clone(&self.cell),
            Arc::clone(&self.manager),
            Arc::clone(&self.encryptor),
            self.encrypt_values,
            self.name.clone(),
        )
    }

    /// Stream of all live entries as text. Each committed state is
    /// reduced to its live entries in one pass; consecutive equal maps
    /// are de-duplicated, so commits that only touch already-expired
    /// entries produce no emission.
    pub async fn watch_all(&self) -> Result<DerivedStream<TtlState, BTreeMap<String, String>>> {
        let manager = Arc::clone(&self.manager);
        let encryptor = Arc::clone(&self.encryptor);
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| {
            state
                .values()
                .filter(|entry| !manager.is_entry_expired(entry))
                .map(|entry| (entry.key.clone(), reveal_with(&*encryptor, entry)))
                .collect()
        }))
    }

    /// Stream of the live string value for `key`; absent and expired
    /// both project to `default`. De-duplicated on the projected value.
    pub async fn watch_string(
        &self,
        key: &str,
        default: &str,
    ) -> Result<DerivedStream<TtlState, String>> {
        let (key, default) = (key.to_string(), default.to_string());
        let manager = Arc::clone(&self.manager);
        let encryptor = Arc::clone(&self.encryptor);
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| {
            live_text_with(&manager, &*encryptor, state, &key).unwrap_or_else(|| default.clone())
        }))
    }

    /// Stream of the live `i32` value for `key`.
    pub async fn watch_i32(&self, key: &str, default: i32) -> Result<DerivedStream<TtlState, i32>> {
        let key = key.to_string();
        let manager = Arc::clone(&self.manager);
        let encryptor = Arc::clone(&self.encryptor);
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| {
            live_text_with(&manager, &*encryptor, state, &key)
                .map_or(default, |t| text_as_i32(&t, default))
        }))
    }

    /// Stream of the live `i64` value for `key`.
    pub async fn watch_i64(&self, key: &str, default: i64) -> Result<DerivedStream<TtlState, i64>> {
        let key = key.to_string();
        let manager = Arc::clone(&self.manager);
        let encryptor = Arc::clone(&self.encryptor);
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| {
            live_text_with(&manager, &*encryptor, state, &key)
                .map_or(default, |t| text_as_i64(&t, default))
        }))
    }

    /// Stream of the live `f32` value for `key`.
    pub async fn watch_f32(&self, key: &str, default: f32) -> Result<DerivedStream<TtlState, f32>> {
        let key = key.to_string();
        let manager = Arc::clone(&self.manager);
        let encryptor = Arc::clone(&self.encryptor);
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| {
            live_text_with(&manager, &*encryptor, state, &key)
                .map_or(default, |t| text_as_f32(&t, default))
        }))
    }

    /// Stream of the live `bool` value for `key`.
    pub async fn watch_bool(
        &self,
        key: &str,
        default: bool,
    ) -> Result<DerivedStream<TtlState, bool>> {
        let key = key.to_string();
        let manager = Arc::clone(&self.manager);
        let encryptor = Arc::clone(&self.encryptor);
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(move |state| {
            live_text_with(&manager, &*encryptor, state, &key)
                .map_or(default, |t| text_as_bool(&t, default))
        }))
    }

    /// One manual cleanup pass: remove every currently expired entry.
    /// Returns how many were removed. This is the same primitive the
    /// periodic job runs.
    pub async fn remove_expired_now(&self) -> Result<usize> {
        let state = self.cell.load().await?;
        let expired = self.expired_keys(&state);
        if expired.is_empty() {
            return Ok(0);
        }
        let removed = expired.len();
        self.remove_keys(expired).await?;
        Ok(removed)
    }

    /// Build a periodic cleanup job for this store. Call
    /// [`spawn`](CleanupJob::spawn) to start it.
    pub fn cleanup_job(&self, interval: Duration) -> CleanupJob {
        CleanupJob::new(self.clone(), interval)
    }

    fn expired_keys(&self, state: &TtlState) -> Vec<String> {
        state
            .values()
            .filter(|entry| self.manager.is_entry_expired(entry))
            .map(|entry| entry.key.clone())
            .collect()
    }

    async fn remove_keys(&self, keys: Vec<String>) -> Result<TtlState> {
        self.cell
            .update(Box::new(move |state| {
                let mut next = state.clone();
                for key in &keys {
                    next.remove(key);
                }
                next
            }))
            .await
    }

    fn live_text(&self, state: &TtlState, key: &str) -> Option<String> {
        live_text_with(&self.manager, self.encryptor.as_ref(), state, key)
    }

    fn reveal(&self, entry: &TtlEntry) -> String {
        reveal_with(self.encryptor.as_ref(), entry)
    }
}

fn live_text_with(
    manager: &TtlManager,
    encryptor: &dyn Encryptor,
    state: &TtlState,
    key: &str,
) -> Option<String> {
    let entry = state.get(key)?;
    if manager.is_entry_expired(entry) {
        return None;
    }
    Some(reveal_with(encryptor, entry))
}

/// The entry's plaintext. A value flagged `encrypted` that fails to
/// decrypt downgrades to the stored text, logged at error level.
fn reveal_with(encryptor: &dyn Encryptor, entry: &TtlEntry) -> String {
    if !entry.encrypted {
        return entry.value.clone();
    }
    match open_text(encryptor, &entry.value) {
        Ok(plain) => plain,
        Err(e) => {
            tracing::error!(key = %entry.key, error = %e, "Value decrypt failed; returning stored text");
            entry.value.clone()
        }
    }
}

/// Builder for a [`TtlStore`].
pub struct TtlStoreBuilder {
    name: String,
    provider: Option<Box<dyn PathProvider>>,
    encryptor: Arc<dyn Encryptor>,
    default_ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    encrypt_values: bool,
}

impl TtlStoreBuilder {
    /// Root the store file under the given directory.
    pub fn base_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.provider = Some(Box::new(BaseDirProvider::new(dir)));
        self
    }

    /// Resolve the store file through a custom provider.
    pub fn path_provider(mut self, provider: impl PathProvider) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Encrypt persisted file bytes with the given encryptor.
    pub fn encryptor(mut self, encryptor: impl Encryptor) -> Self {
        self.encryptor = Arc::new(encryptor);
        self
    }

    /// Lifetime applied to puts that do not carry their own. Without
    /// this, such puts never expire.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Additionally encrypt each stored value (base64-wrapped, entry
    /// flagged `encrypted`). Requires an encryptor to be useful; with
    /// the default pass-through this only base64-wraps.
    pub fn encrypt_values(mut self, enabled: bool) -> Self {
        self.encrypt_values = enabled;
        self
    }

    /// Override the clock. Tests use [`ManualClock`](super::ManualClock)
    /// to drive expiry deterministically.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve the path and open the store, reusing the process-wide
    /// cell if this name is already open.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or no base directory can
    /// be resolved.
    pub fn open(self) -> Result<TtlStore> {
        let path = match &self.provider {
            Some(provider) => provider.resolve(&self.name)?,
            None => BaseDirProvider::documents()?.resolve(&self.name)?,
        };

        let name = self.name.clone();
        let encryptor = Arc::clone(&self.encryptor);
        let cell = registry::ttl_cells().obtain(path.clone(), || {
            debug!(store = %name, path = %path.display(), "Opening TTL store");
            FileCell::new(
                name.clone(),
                path.clone(),
                JsonCodec::<TtlState>::new(),
                encryptor,
            )
        });

        Ok(self.assemble(cell))
    }

    /// Open a non-persistent store with the identical contract.
    pub fn open_in_memory(self) -> TtlStore {
        self.assemble(Arc::new(MemoryCell::<TtlState>::default()))
    }

    fn assemble(self, cell: Arc<dyn StateCell<TtlState>>) -> TtlStore {
        TtlStore {
            cell,
            manager: Arc::new(TtlManager::new(self.default_ttl, self.clock)),
            encryptor: self.encryptor,
            encrypt_values: self.encrypt_values,
            name: self.name,
        }
    }
}
