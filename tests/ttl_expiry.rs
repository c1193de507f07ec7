//! End-to-end TTL tests through the public API, driven by the real
//! clock. Deterministic expiry tests live next to the engine with a
//! manual clock; these verify the wall-clock path works.

use std::time::Duration;

use anyhow::Result;
use cellar::TtlStore;
use tempfile::TempDir;

#[tokio::test]
async fn short_ttl_expires_and_long_ttl_survives() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TtlStore::builder("sessions")
        .base_dir(dir.path())
        .default_ttl(Duration::from_secs(10))
        .open()?;

    store
        .edit()
        .put_string("short", "s", Some(Duration::from_millis(200)))?
        .put_string("long", "l", Some(Duration::from_secs(100)))?
        .commit()
        .await?;

    assert_eq!(store.get_string("short", "def").await?, "s");

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(store.get_string("short", "def").await?, "def");
    assert_eq!(store.get_string("long", "def").await?, "l");
    assert!(!store.contains("short").await?);
    assert!(store.contains("long").await?);
    Ok(())
}

#[tokio::test]
async fn get_all_drops_expired_from_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TtlStore::builder("mixed")
        .base_dir(dir.path())
        .open()?;

    store
        .edit()
        .put_string("ephemeral", "x", Some(Duration::from_millis(50)))?
        .put_string("stable", "y", None)?
        .commit()
        .await?;

    tokio::time::sleep(Duration::from_millis(150)).await;

    let all = store.get_all().await?;
    assert_eq!(all.len(), 1);
    assert_eq!(all.get("stable").map(String::as_str), Some("y"));

    let raw = std::fs::read_to_string(dir.path().join("mixed.preferences_pb"))?;
    assert!(!raw.contains("ephemeral"));
    Ok(())
}

#[tokio::test]
async fn cleanup_job_bounds_the_store() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TtlStore::builder("swept")
        .base_dir(dir.path())
        .open()?;

    store
        .edit()
        .put_string("a", "1", Some(Duration::from_millis(50)))?
        .put_string("b", "2", Some(Duration::from_millis(50)))?
        .commit()
        .await?;

    let handle = store.cleanup_job(Duration::from_millis(100)).spawn();
    tokio::time::sleep(Duration::from_millis(350)).await;
    handle.stop();

    let raw = std::fs::read_to_string(dir.path().join("swept.preferences_pb"))?;
    assert_eq!(raw, "{}");
    Ok(())
}

#[tokio::test]
async fn wire_format_carries_duration_and_deadline() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TtlStore::builder("wire")
        .base_dir(dir.path())
        .open()?;

    store
        .edit()
        .put_string("k", "v", Some(Duration::from_secs(3600)))?
        .commit()
        .await?;

    let raw = std::fs::read_to_string(dir.path().join("wire.preferences_pb"))?;
    let doc: serde_json::Value = serde_json::from_str(&raw)?;
    let entry = &doc["k"];

    assert_eq!(entry["key"], "k");
    assert_eq!(entry["value"], "v");
    assert_eq!(entry["duration"], "PT3600S");
    assert!(entry["expiresAt"].is_i64());
    assert_eq!(entry["encrypted"], false);
    Ok(())
}
