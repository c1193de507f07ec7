//! File-backed state cell with crash-safe replacement.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use super::{StateCell, Transform};
use crate::codec::Codec;
use crate::crypto::Encryptor;
use crate::error::{Result, StoreError};
use crate::stream::SnapshotStream;

/// File-backed cell holding one serialized value.
///
/// The write path is a read-modify-write pipeline with serialized
/// writers: load the current state, apply the transform, encode and
/// encrypt, write to a temp file, fsync, and atomically rename over the
/// target. The cached state and the snapshot broadcast are updated only
/// after the rename succeeds, so readers never observe a torn write.
///
/// All file IO runs on the blocking worker pool. The pipeline executes
/// as a single blocking unit, which also makes an in-flight commit
/// immune to caller cancellation: once the write begins, it finishes.
pub struct FileCell<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    name: String,
    path: PathBuf,
    codec: Box<dyn Codec<T>>,
    encryptor: Arc<dyn Encryptor>,
    /// Cached state; `None` until first access. The mutex also
    /// serializes the whole write pipeline.
    state: Mutex<Option<T>>,
    snapshots: watch::Sender<T>,
}

impl<T> FileCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell over the given file. No IO happens until the first
    /// read or update.
    pub fn new(
        name: impl Into<String>,
        path: PathBuf,
        codec: impl Codec<T>,
        encryptor: Arc<dyn Encryptor>,
    ) -> Self {
        let (snapshots, _) = watch::channel(codec.default_value());
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                path,
                codec: Box::new(codec),
                encryptor,
                state: Mutex::new(None),
                snapshots,
            }),
        }
    }

    /// The file this cell persists to.
    pub fn path(&self) -> &std::path::Path {
        &self.inner.path
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Load the cached state, reading the file on first access.
    fn load_sync(&self) -> Result<T> {
        let mut state = self.state.lock();
        self.load_locked(&mut state)
    }

    fn load_locked(&self, state: &mut Option<T>) -> Result<T> {
        if let Some(value) = state.as_ref() {
            return Ok(value.clone());
        }

        let value = self.read_file()?;
        *state = Some(value.clone());
        // Prime the broadcast before any subscriber can attach; the
        // subscribe path loads first.
        self.snapshots.send_replace(value.clone());
        Ok(value)
    }

    /// Read and decode the backing file.
    ///
    /// Missing or empty files yield the codec default. Decode failures
    /// also yield the default, logged but non-fatal, and the file is
    /// left in place. A decrypt failure downgrades to decoding the raw
    /// bytes so plaintext files survive an encryptor being configured
    /// later.
    fn read_file(&self) -> Result<T> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(self.codec.default_value());
            }
            Err(e) => return Err(StoreError::read(&self.name, e)),
        };

        if bytes.is_empty() {
            return Ok(self.codec.default_value());
        }

        let plain = match self.encryptor.decrypt(&bytes) {
            Ok(plain) => plain,
            Err(e) => {
                error!(store = %self.name, error = %e, "Decrypt failed; decoding raw bytes");
                bytes
            }
        };

        match self.codec.decode(&plain) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(store = %self.name, error = %e, "Corrupt store file; adopting default state");
                Ok(self.codec.default_value())
            }
        }
    }

    /// The full read-modify-write pipeline, serialized by the state
    /// mutex.
    fn update_sync(&self, transform: Transform<T>) -> Result<T> {
        let mut state = self.state.lock();
        let current = self.load_locked(&mut state)?;
        let next = transform(&current);

        // Everything that can fail mid-commit surfaces as a write
        // error: serialization, encryption, and the file replacement.
        let encoded = self
            .codec
            .encode(&next)
            .map_err(|e| StoreError::write(&self.name, e))?;
        let bytes = self
            .encryptor
            .encrypt(&encoded)
            .map_err(|e| StoreError::write(&self.name, e))?;
        self.replace_file(&bytes)
            .map_err(|e| StoreError::write(&self.name, e))?;

        *state = Some(next.clone());
        self.snapshots.send_replace(next.clone());
        debug!(store = %self.name, bytes = bytes.len(), "Committed state");
        Ok(next)
    }

    /// Write bytes to `<path>.tmp`, fsync, and rename over the target.
    fn replace_file(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
    }
}

#[async_trait]
impl<T> StateCell<T> for FileCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn load(&self) -> Result<T> {
        // Fast path: already cached, no blocking IO needed.
        if let Some(value) = self.inner.state.lock().as_ref() {
            return Ok(value.clone());
        }

        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.load_sync())
            .await
            .map_err(|e| StoreError::read(&self.inner.name, e))?
    }

    async fn update(&self, transform: Transform<T>) -> Result<T> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.update_sync(transform))
            .await
            .map_err(|e| StoreError::write(&self.inner.name, e))?
    }

    async fn subscribe(&self) -> Result<SnapshotStream<T>> {
        // Make sure subscribers see the on-disk state, not the codec
        // default the channel was constructed with.
        self.load().await?;
        Ok(SnapshotStream::new(self.inner.snapshots.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::TempDir;

    use super::*;
    use crate::codec::{JsonCodec, PrefState};
    use crate::crypto::{AesGcmEncryptor, Passthrough};

    fn cell_at(dir: &TempDir, name: &str) -> FileCell<PrefState> {
        FileCell::new(
            name,
            dir.path().join(format!("{name}.preferences_pb")),
            JsonCodec::<PrefState>::new(),
            Arc::new(Passthrough),
        )
    }

    fn insert(key: &str, value: &str) -> Transform<PrefState> {
        let (key, value) = (key.to_string(), value.to_string());
        Box::new(move |state| {
            let mut next = state.clone();
            next.insert(key, value);
            next
        })
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = TempDir::new().unwrap();
        let cell = cell_at(&dir, "fresh");
        assert_eq!(cell.load().await.unwrap(), BTreeMap::new());
    }

    #[tokio::test]
    async fn update_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.preferences_pb");

        let cell = FileCell::new(
            "prefs",
            path.clone(),
            JsonCodec::<PrefState>::new(),
            Arc::new(Passthrough),
        );
        cell.update(insert("theme", "dark")).await.unwrap();

        // A second cell over the same file sees the committed state.
        let reopened = FileCell::new(
            "prefs",
            path,
            JsonCodec::<PrefState>::new(),
            Arc::new(Passthrough),
        );
        let state = reopened.load().await.unwrap();
        assert_eq!(state.get("theme").map(String::as_str), Some("dark"));
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let cell = cell_at(&dir, "clean");
        cell.update(insert("a", "1")).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["clean.preferences_pb"]);
    }

    #[tokio::test]
    async fn corrupt_file_adopts_default_without_deleting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.preferences_pb");
        std::fs::write(&path, b"{{{ not json").unwrap();

        let cell = FileCell::new(
            "bad",
            path.clone(),
            JsonCodec::<PrefState>::new(),
            Arc::new(Passthrough),
        );
        assert_eq!(cell.load().await.unwrap(), BTreeMap::new());
        assert_eq!(std::fs::read(&path).unwrap(), b"{{{ not json");
    }

    #[tokio::test]
    async fn subscriber_sees_each_commit_in_order() {
        let dir = TempDir::new().unwrap();
        let cell = cell_at(&dir, "stream");

        let mut stream = cell.subscribe().await.unwrap();
        assert!(stream.next().await.unwrap().is_empty());

        cell.update(insert("k", "1")).await.unwrap();
        let state = stream.next().await.unwrap();
        assert_eq!(state.get("k").map(String::as_str), Some("1"));

        cell.update(insert("k", "2")).await.unwrap();
        let state = stream.next().await.unwrap();
        assert_eq!(state.get("k").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn encrypted_cell_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.preferences_pb");
        let encryptor: Arc<dyn Encryptor> = Arc::new(AesGcmEncryptor::from_passphrase("pw"));

        let cell = FileCell::new(
            "secret",
            path.clone(),
            JsonCodec::<PrefState>::new(),
            Arc::clone(&encryptor),
        );
        cell.update(insert("token", "abc123")).await.unwrap();

        // The raw file must not contain the plaintext.
        let raw = std::fs::read(&path).unwrap();
        assert!(!raw.windows(6).any(|w| w == b"abc123"));

        let reopened = FileCell::new("secret", path, JsonCodec::<PrefState>::new(), encryptor);
        let state = reopened.load().await.unwrap();
        assert_eq!(state.get("token").map(String::as_str), Some("abc123"));
    }

    #[tokio::test]
    async fn plaintext_file_survives_encryptor_configuration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.preferences_pb");

        let plain = FileCell::new(
            "mixed",
            path.clone(),
            JsonCodec::<PrefState>::new(),
            Arc::new(Passthrough),
        );
        plain.update(insert("k", "v")).await.unwrap();

        let encrypted = FileCell::new(
            "mixed",
            path,
            JsonCodec::<PrefState>::new(),
            Arc::new(AesGcmEncryptor::from_passphrase("pw")),
        );
        let state = encrypted.load().await.unwrap();
        assert_eq!(state.get("k").map(String::as_str), Some("v"));
    }
}
