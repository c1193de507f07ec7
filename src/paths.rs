//! Path resolution for store files.
//!
//! Every named store persists to a single file resolved through a
//! [`PathProvider`]. The default provider roots stores under the user's
//! documents directory; embedders with platform-specific layouts supply
//! their own implementation.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// File extension for persisted stores.
pub const STORE_FILE_EXTENSION: &str = "preferences_pb";

/// Resolves a store name to the absolute file path holding its state.
pub trait PathProvider: Send + Sync + 'static {
    /// Resolve `name` to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or no base directory can
    /// be determined.
    fn resolve(&self, name: &str) -> Result<PathBuf>;
}

/// Path provider rooted at a fixed base directory.
///
/// Stores land at `<base>/<name>.preferences_pb`. The directory is
/// created on the first write.
#[derive(Debug, Clone)]
pub struct BaseDirProvider {
    base: PathBuf,
}

impl BaseDirProvider {
    /// Create a provider rooted at the given directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Create a provider rooted at the user's documents directory,
    /// falling back to the home directory when the platform does not
    /// report one.
    ///
    /// # Errors
    ///
    /// Returns an error if neither directory can be determined.
    pub fn documents() -> Result<Self> {
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .map(Self::new)
            .ok_or_else(|| StoreError::read("<paths>", "no documents or home directory"))
    }
}

impl PathProvider for BaseDirProvider {
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_store_name(name)?;
        Ok(self.base.join(format!("{name}.{STORE_FILE_EXTENSION}")))
    }
}

/// Reject names that are empty or would escape the base directory.
pub(crate) fn validate_store_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(StoreError::invalid_name(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_under_base_dir() {
        let provider = BaseDirProvider::new("/tmp/stores");
        let path = provider.resolve("settings").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/stores/settings.preferences_pb"));
    }

    #[test]
    fn rejects_invalid_names() {
        let provider = BaseDirProvider::new("/tmp/stores");
        assert!(provider.resolve("").is_err());
        assert!(provider.resolve("../escape").is_err());
        assert!(provider.resolve("a/b").is_err());
        assert!(provider.resolve("a\\b").is_err());
    }
}
