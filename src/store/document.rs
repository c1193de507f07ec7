//! Single-document store for one opaque string payload.

use std::sync::Arc;

use tracing::debug;

use crate::cell::{FileCell, MemoryCell, StateCell};
use crate::codec::TextCodec;
use crate::crypto::{Encryptor, Passthrough};
use crate::error::Result;
use crate::paths::{BaseDirProvider, PathProvider};
use crate::registry;
use crate::stream::DerivedStream;

/// Store holding a single serialized payload as an opaque string.
///
/// The engine does not interpret the payload: callers that want typed
/// documents serialize externally, typically by wrapping
/// [`read`](Self::read)/[`write`](Self::write) in their own
/// decode/encode pair, or atomically with [`modify`](Self::modify).
/// The default value is the empty string.
#[derive(Clone)]
pub struct DocumentStore {
    cell: Arc<dyn StateCell<String>>,
    name: String,
}

impl DocumentStore {
    /// Start building a persistent store with the given name.
    pub fn builder(name: impl Into<String>) -> DocumentStoreBuilder {
        DocumentStoreBuilder {
            name: name.into(),
            provider: None,
            encryptor: Arc::new(Passthrough),
        }
    }

    /// Create a non-persistent store with the identical contract.
    pub fn in_memory() -> Self {
        Self {
            cell: Arc::new(MemoryCell::new(String::new())),
            name: "<memory>".to_string(),
        }
    }

    /// The store's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current document, or the empty string if none was written.
    pub async fn read(&self) -> Result<String> {
        self.cell.load().await
    }

    /// Atomically replace the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`](crate::StoreError::Write) if the
    /// file replacement fails; the previous document stays intact.
    pub async fn write(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.cell.update(Box::new(move |_| text)).await?;
        Ok(())
    }

    /// Atomically rewrite the document from its current value. The
    /// closure runs under the cell's write serialization, so no commit
    /// can interleave between the read and the write.
    pub async fn modify(
        &self,
        rewrite: impl FnOnce(&str) -> String + Send + 'static,
    ) -> Result<String> {
        self.cell.update(Box::new(move |text| rewrite(text))).await
    }

    /// Stream of the document, de-duplicated on content.
    pub async fn watch(&self) -> Result<DerivedStream<String, String>> {
        let stream = self.cell.subscribe().await?;
        Ok(stream.project(Clone::clone))
    }
}

/// Builder for a persistent [`DocumentStore`].
pub struct DocumentStoreBuilder {
    name: String,
    provider: Option<Box<dyn PathProvider>>,
    encryptor: Arc<dyn Encryptor>,
}

impl DocumentStoreBuilder {
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

    /// Encrypt persisted bytes. For documents the ciphertext is stored
    /// raw (no base64 wrapping).
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
    /// be resolved.
    pub fn open(self) -> Result<DocumentStore> {
        let path = match &self.provider {
            Some(provider) => provider.resolve(&self.name)?,
            None => BaseDirProvider::documents()?.resolve(&self.name)?,
        };

        let name = self.name.clone();
        let encryptor = Arc::clone(&self.encryptor);
        let cell = registry::document_cells().obtain(path.clone(), || {
            debug!(store = %name, path = %path.display(), "Opening document store");
            FileCell::new(name.clone(), path.clone(), TextCodec, encryptor)
        });

        Ok(DocumentStore {
            cell,
            name: self.name,
        })
    }
}
