//! Preference and document stores.
//!
//! A [`PreferenceStore`] is a typed map of scalar values persisted as
//! one canonical-JSON file; a [`DocumentStore`] holds a single opaque
//! string payload. Both wrap a state cell, so the persistent and
//! in-memory variants expose the identical surface.
//!
//! # Example
//!
//! ```ignore
//! use cellar::PreferenceStore;
//!
//! let store = PreferenceStore::builder("settings").open()?;
//! store
//!     .edit()
//!     .put_string("name", "Santiago")?
//!     .put_i32("age", 30)?
//!     .commit()
//!     .await?;
//!
//! assert_eq!(store.get_i32("age", 0).await?, 30);
//! ```

mod document;
mod editor;
mod preferences;


pub use document::{DocumentStore, DocumentStoreBuilder};
pub use editor::Editor;
pub use preferences::{PreferenceStore, PreferenceStoreBuilder};
