//! TTL-enabled key-value store.
//!
//! Same typed surface as the preference store, plus per-key or default
//! expiry. Expired entries read as absent; they are physically removed
//! lazily in batch (on [`TtlStore::get_all`]) and periodically (via
//! [`TtlStore::cleanup_job`]) — never on single-key reads, which keeps
//! the hot read path write-free.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use cellar::TtlStore;
//!
//! let store = TtlStore::builder("sessions")
//!     .default_ttl(Duration::from_secs(3600))
//!     .open()?;
//!
//! store
//!     .edit()
//!     .put_string("token", "abc", Some(Duration::from_secs(60)))?
//!     .commit()
//!     .await?;
//! ```

mod cleanup;
mod editor;
mod entry;
mod engine;
mod manager;


pub use cleanup::{CleanupHandle, CleanupJob};
pub use editor::TtlEditor;
pub use entry::TtlEntry;
pub use engine::{TtlStore, TtlStoreBuilder};
pub use manager::{Clock, ManualClock, SystemClock, TtlManager};
