//! Embeddable, type-safe key-value persistence.
//!
//! `cellar` persists named stores to single files on the local file
//! system and exposes four capabilities:
//!
//! - [`PreferenceStore`]: typed scalar values (string, `i32`, `i64`,
//!   `f32`, `bool`) persisted as canonical JSON
//! - [`TtlStore`]: the same surface with per-key or default expiry
//! - [`DocumentStore`]: a single opaque string payload
//! - [`Encryptor`]: optional symmetric encryption of persisted bytes
//!
//! Writers batch mutations in an editor and commit atomically; each
//! commit is a crash-safe replace-by-rename of the store file. Readers
//! take point-in-time snapshots or subscribe to a live stream of
//! committed states with last-value semantics. Within a process, every
//! open of the same store name shares one underlying cell, so all
//! handles observe the same serialized writes and the same broadcast.
//!
//! Stores are single-process: sharing a store file across OS processes
//! is unsupported and will corrupt state.
//!
//! # Example
//!
//! ```ignore
//! use cellar::PreferenceStore;
//!
//! let store = PreferenceStore::builder("settings")
//!     .base_dir("/var/lib/myapp")
//!     .open()?;
//!
//! store
//!     .edit()
//!     .put_string("name", "Santiago")?
//!     .put_i32("age", 30)?
//!     .put_bool("premium", true)?
//!     .commit()
//!     .await?;
//!
//! assert_eq!(store.get_string("name", "?").await?, "Santiago");
//!
//! let mut ages = store.watch_i32("age", 0).await?;
//! while let Some(age) = ages.next().await {
//!     println!("age is now {age}");
//! }
//! ```

pub mod cell;
pub mod codec;
pub mod crypto;
mod error;
pub mod paths;
mod registry;
pub mod store;
pub mod stream;
pub mod ttl;
pub mod value;

pub use cell::{FileCell, MemoryCell, StateCell};
pub use codec::{Codec, JsonCodec, PrefState, TextCodec, TtlState};
pub use crypto::{AesGcmEncryptor, Encryptor, Passthrough};
pub use error::{Result, StoreError};
pub use paths::{BaseDirProvider, PathProvider, STORE_FILE_EXTENSION};
pub use store::{DocumentStore, DocumentStoreBuilder, Editor, PreferenceStore, PreferenceStoreBuilder};
pub use stream::{DerivedStream, SnapshotStream};
pub use ttl::{
    CleanupHandle, CleanupJob, Clock, ManualClock, SystemClock, TtlEditor, TtlEntry, TtlManager,
    TtlStore, TtlStoreBuilder,
};
pub use value::{Value, ValueKind};
