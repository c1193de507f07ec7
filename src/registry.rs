//! Process-wide registry of open cells.
//!
//! At most one [`FileCell`] exists per absolute file path within the
//! process: every store opened for the same name shares the same cell,
//! and therefore the same write serialization and snapshot stream.
//! Cross-process sharing is not supported.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::cell::FileCell;
use crate::codec::{PrefState, TtlState};

/// Singleton map from file path to open cell for one state type.
///
/// Lookups are lock-free on the fast path; on a miss the map's entry
/// API holds the shard lock while the cell is constructed, so two
/// concurrent opens of the same name still converge on one cell.
/// Construction is cheap: a cell does no IO until first access.
pub(crate) struct Registry<T> {
    cells: DashMap<PathBuf, Arc<FileCell<T>>>,
}

impl<T> Registry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// The cell for `path`, building it with `make` if absent.
    pub(crate) fn obtain(
        &self,
        path: PathBuf,
        make: impl FnOnce() -> FileCell<T>,
    ) -> Arc<FileCell<T>> {
        self.cells
            .entry(path)
            .or_insert_with(|| Arc::new(make()))
            .clone()
    }

    /// Number of open cells of this state type.
    #[allow(dead_code)]
    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Registry for preference-store cells.
pub(crate) fn preference_cells() -> &'static Registry<PrefState> {
    static CELLS: OnceLock<Registry<PrefState>> = OnceLock::new();
    CELLS.get_or_init(Registry::new)
}

/// Registry for TTL-store cells.
pub(crate) fn ttl_cells() -> &'static Registry<TtlState> {
    static CELLS: OnceLock<Registry<TtlState>> = OnceLock::new();
    CELLS.get_or_init(Registry::new)
}

/// Registry for document-store cells.
pub(crate) fn document_cells() -> &'static Registry<String> {
    static CELLS: OnceLock<Registry<String>> = OnceLock::new();
    CELLS.get_or_init(Registry::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::crypto::Passthrough;

    fn make_cell(name: &str, path: PathBuf) -> FileCell<PrefState> {
        FileCell::new(
            name,
            path,
            JsonCodec::<PrefState>::new(),
            Arc::new(Passthrough),
        )
    }

    #[test]
    fn same_path_yields_same_cell() {
        let registry: Registry<PrefState> = Registry::new();
        let path = PathBuf::from("/tmp/registry-test.preferences_pb");

        let a = registry.obtain(path.clone(), || make_cell("registry-test", path.clone()));
        let b = registry.obtain(path.clone(), || make_cell("registry-test", path.clone()));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_paths_yield_different_cells() {
        let registry: Registry<PrefState> = Registry::new();
        let path_a = PathBuf::from("/tmp/a.preferences_pb");
        let path_b = PathBuf::from("/tmp/b.preferences_pb");

        let a = registry.obtain(path_a.clone(), || make_cell("a", path_a.clone()));
        let b = registry.obtain(path_b.clone(), || make_cell("b", path_b.clone()));

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }
}
