//! End-to-end tests for the preference store through the public API.

use anyhow::Result;
use cellar::{AesGcmEncryptor, PreferenceStore, StoreError};
use tempfile::TempDir;

#[tokio::test]
async fn profile_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let store = PreferenceStore::builder("profile")
        .base_dir(dir.path())
        .open()?;

    store
        .edit()
        .put_string("name", "Santiago")?
        .put_i32("age", 30)?
        .put_bool("premium", true)?
        .commit()
        .await?;

    assert_eq!(store.get_string("name", "?").await?, "Santiago");
    assert_eq!(store.get_i32("age", 0).await?, 30);
    assert!(store.get_bool("premium", false).await?);
    assert_eq!(store.get_all().await?.len(), 3);
    assert!(store.contains("name").await?);

    // The file on disk is canonical JSON with sorted keys.
    let raw = std::fs::read_to_string(dir.path().join("profile.preferences_pb"))?;
    assert_eq!(
        raw,
        r#"{"age":"30","name":"Santiago","premium":"true"}"#
    );
    Ok(())
}

#[tokio::test]
async fn editor_cannot_be_reused_after_commit() -> Result<()> {
    let dir = TempDir::new()?;
    let store = PreferenceStore::builder("one-shot")
        .base_dir(dir.path())
        .open()?;

    let editor = store.edit();
    editor.put_string("x", "y")?;
    editor.commit().await?;

    assert!(matches!(
        editor.put_string("x", "z"),
        Err(StoreError::InvalidState { .. })
    ));
    assert!(matches!(
        editor.commit().await,
        Err(StoreError::InvalidState { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn concurrent_commits_all_land() -> Result<()> {
    let dir = TempDir::new()?;
    let store = PreferenceStore::builder("contended")
        .base_dir(dir.path())
        .open()?;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .edit()
                .put_i32(format!("key-{i}"), i)
                .unwrap()
                .commit()
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await?;
    }

    // Writers are serialized per cell; no commit can clobber another.
    let all = store.get_all().await?;
    assert_eq!(all.len(), 16);
    for i in 0..16 {
        assert_eq!(store.get_i32(&format!("key-{i}"), -1).await?, i);
    }
    Ok(())
}

#[tokio::test]
async fn encrypted_store_reads_its_own_writes() -> Result<()> {
    let dir = TempDir::new()?;
    let store = PreferenceStore::builder("vault")
        .base_dir(dir.path())
        .encryptor(AesGcmEncryptor::from_passphrase("swordfish"))
        .open()?;

    store
        .edit()
        .put_string("api-key", "s3cr3t-value")?
        .commit()
        .await?;

    assert_eq!(store.get_string("api-key", "?").await?, "s3cr3t-value");

    let raw = std::fs::read(dir.path().join("vault.preferences_pb"))?;
    assert!(!raw.windows(6).any(|w| w == b"s3cr3t"));
    Ok(())
}

#[tokio::test]
async fn reopening_by_name_shares_state_and_stream() -> Result<()> {
    let dir = TempDir::new()?;
    let open = || {
        PreferenceStore::builder("shared")
            .base_dir(dir.path())
            .open()
    };

    let writer = open()?;
    let reader = open()?;

    let mut stream = reader.watch_string("greeting", "").await?;
    assert_eq!(stream.next().await.unwrap(), "");

    writer.edit().put_string("greeting", "hi")?.commit().await?;

    assert_eq!(stream.next().await.unwrap(), "hi");
    assert_eq!(reader.get_string("greeting", "?").await?, "hi");
    Ok(())
}
