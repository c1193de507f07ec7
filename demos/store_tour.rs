//! # Store Tour
//!
//! This example walks through the three store variants: the typed
//! preference store, the TTL store, and the single-document store,
//! plus encryption at rest and the reactive snapshot streams.
//!
//! ## Running This Example
//!
//! ```bash
//! cargo run --example store_tour
//! ```
//!
//! The example writes into a temporary directory that is cleaned up on
//! exit.

use std::time::Duration;

use anyhow::Result;
use cellar::{AesGcmEncryptor, DocumentStore, PreferenceStore, TtlStore};
use tempfile::TempDir;

#[tokio::main]
async fn main() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let base = temp_dir.path();

    // =========================================================================
    // Part 1: Typed preferences with an atomic batch commit
    // =========================================================================

    println!("--- Part 1: Preference store ---\n");

    let prefs = PreferenceStore::builder("settings").base_dir(base).open()?;

    // Mutations accumulate in an editor and land as one commit: readers
    // either see none of them or all of them.
    prefs
        .edit()
        .put_string("name", "Santiago")?
        .put_i32("age", 30)?
        .put_bool("premium", true)?
        .commit()
        .await?;

    println!("name    = {}", prefs.get_string("name", "?").await?);
    println!("age     = {}", prefs.get_i32("age", 0).await?);
    println!("premium = {}", prefs.get_bool("premium", false).await?);

    // Missing keys and type mismatches return the default, never an error.
    println!("missing = {}", prefs.get_string("missing", "fallback").await?);
    println!("name as i32 = {}", prefs.get_i32("name", -1).await?);

    // =========================================================================
    // Part 2: Watching keys
    // =========================================================================

    println!("\n--- Part 2: Snapshot streams ---\n");

    // A per-key stream yields the current value immediately, then once
    // per change of the interpreted value.
    let mut ages = prefs.watch_i32("age", 0).await?;
    println!("age stream starts at {}", ages.next().await.unwrap());

    prefs.edit().put_i32("age", 31)?.commit().await?;
    println!("age stream now {}", ages.next().await.unwrap());

    // =========================================================================
    // Part 3: TTL store
    // =========================================================================

    println!("\n--- Part 3: TTL store ---\n");

    let sessions = TtlStore::builder("sessions")
        .base_dir(base)
        .default_ttl(Duration::from_secs(3600))
        .open()?;

    sessions
        .edit()
        // Explicit per-key lifetime overrides the store default.
        .put_string("flash", "gone soon", Some(Duration::from_millis(300)))?
        // No lifetime: the 1-hour default applies.
        .put_string("token", "abc123", None)?
        .commit()
        .await?;

    println!("flash = {}", sessions.get_string("flash", "<expired>").await?);

    tokio::time::sleep(Duration::from_millis(500)).await;

    // Expired keys read as absent; single-key reads never write.
    println!("flash after 500ms = {}", sessions.get_string("flash", "<expired>").await?);
    println!("token after 500ms = {}", sessions.get_string("token", "<expired>").await?);

    // get_all() physically removes every expired entry it encounters.
    let live = sessions.get_all().await?;
    println!("live entries: {live:?}");

    // A periodic job keeps the store bounded without any reads.
    let cleanup = sessions.cleanup_job(Duration::from_secs(60)).spawn();
    cleanup.stop();

    // =========================================================================
    // Part 4: Document store
    // =========================================================================

    println!("\n--- Part 4: Document store ---\n");

    let doc = DocumentStore::builder("profile").base_dir(base).open()?;

    // The payload is opaque; serialize however you like.
    doc.write(r#"{"theme":"dark","zoom":1.25}"#).await?;
    println!("document = {}", doc.read().await?);

    // modify() is an atomic read-modify-write under the store's write lock.
    doc.modify(|current| current.replace("dark", "light")).await?;
    println!("modified = {}", doc.read().await?);

    // =========================================================================
    // Part 5: Encryption at rest
    // =========================================================================

    println!("\n--- Part 5: Encryption ---\n");

    let vault = PreferenceStore::builder("vault")
        .base_dir(base)
        .encryptor(AesGcmEncryptor::from_passphrase("correct horse battery staple"))
        .open()?;

    vault.edit().put_string("api-key", "s3cr3t")?.commit().await?;
    println!("decrypted read = {}", vault.get_string("api-key", "?").await?);

    let raw = std::fs::read(base.join("vault.preferences_pb"))?;
    println!("file bytes are ciphertext ({} bytes, no plaintext)", raw.len());

    Ok(())
}
