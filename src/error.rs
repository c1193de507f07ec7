//! Error types for store operations.
//!
//! All fallible operations in this crate return [`StoreError`]. Callers
//! match on the variant to distinguish read-side failures (which the
//! getter API downgrades to defaults) from write-side failures (which
//! always surface from `commit`).

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Reading or decoding a store's on-disk state failed.
    #[error("failed to read store '{name}': {reason}")]
    Read { name: String, reason: String },

    /// A commit's serialization, encryption, or file replacement failed.
    /// No partial mutation persists when this is returned.
    #[error("failed to write store '{name}': {reason}")]
    Write { name: String, reason: String },

    /// State could not be encoded or decoded.
    #[error("codec error: {reason}")]
    Codec { reason: String },

    /// Encryption failed; the plaintext was not persisted.
    #[error("encryption failed: {reason}")]
    Encrypt { reason: String },

    /// Decryption failed; the ciphertext is not recoverable to plaintext.
    #[error("decryption failed: {reason}")]
    Decrypt { reason: String },

    /// An editor was used after `commit`, or while a commit was in
    /// progress.
    #[error("invalid editor state: {reason}")]
    InvalidState { reason: String },

    /// A store name or key failed validation.
    #[error("invalid name: '{name}'")]
    InvalidName { name: String },

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create a read error for the named store.
    pub fn read(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Read {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a write error for the named store.
    pub fn write(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Write {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a codec error.
    pub fn codec(reason: impl ToString) -> Self {
        Self::Codec {
            reason: reason.to_string(),
        }
    }

    /// Create an encryption error.
    pub fn encrypt(reason: impl ToString) -> Self {
        Self::Encrypt {
            reason: reason.to_string(),
        }
    }

    /// Create a decryption error.
    pub fn decrypt(reason: impl ToString) -> Self {
        Self::Decrypt {
            reason: reason.to_string(),
        }
    }

    /// Create an invalid-state error.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Create an invalid-name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
