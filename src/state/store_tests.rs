//! Tests for WatermarkStore

use super::*;
use crate::error::Error;
use chrono::NaiveDate;
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_store_new() {
    let store = WatermarkStore::new("/tmp/watermark.json");
    assert!(!store.is_in_memory());
    assert_eq!(store.path().to_str().unwrap(), "/tmp/watermark.json");
}

#[test]
fn test_store_in_memory() {
    assert!(WatermarkStore::in_memory().is_in_memory());
}

#[test]
fn test_from_file_rejects_corrupt_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = WatermarkStore::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse state file"));
}

// ============================================================================
// Watermark Tests
// ============================================================================

#[tokio::test]
async fn test_no_watermark_is_error() {
    let store = WatermarkStore::in_memory();
    assert!(store.get_last_state().await.is_err());
}

#[tokio::test]
async fn test_initial_watermark_fallback() {
    let store = WatermarkStore::in_memory().with_initial(Some(date(2024, 1, 1)));
    assert_eq!(store.get_last_state().await.unwrap(), "2024-01-01");
}

#[tokio::test]
async fn test_update_and_get() {
    let store = WatermarkStore::in_memory().with_initial(Some(date(2024, 1, 1)));

    store.update_state("2024-01-03").await.unwrap();
    assert_eq!(store.get_last_state().await.unwrap(), "2024-01-03");

    // Same date again is allowed
    store.update_state("2024-01-03").await.unwrap();
    assert_eq!(store.last_date().await.unwrap(), date(2024, 1, 3));
}

#[tokio::test]
async fn test_watermark_never_moves_backwards() {
    let store = WatermarkStore::in_memory();
    store.update_state("2024-01-05").await.unwrap();

    let err = store.update_state("2024-01-04").await.unwrap_err();
    assert!(err.to_string().contains("cannot move backwards"));
    assert_eq!(store.get_last_state().await.unwrap(), "2024-01-05");
}

#[tokio::test]
async fn test_backwards_from_initial_rejected() {
    let store = WatermarkStore::in_memory().with_initial(Some(date(2024, 1, 5)));
    assert!(store.advance_to(date(2024, 1, 1)).await.is_err());
}

#[tokio::test]
async fn test_malformed_date_rejected() {
    let store = WatermarkStore::in_memory();
    let err = store.update_state("03/01/2024").await.unwrap_err();
    assert!(err.to_string().contains("expected YYYY-MM-DD"));
}

#[tokio::test]
async fn test_reset_overrides_order() {
    let store = WatermarkStore::in_memory();
    store.update_state("2024-01-05").await.unwrap();
    store.reset_to(date(2023, 12, 31)).await.unwrap();
    assert_eq!(store.get_last_state().await.unwrap(), "2023-12-31");
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_persist_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let store = WatermarkStore::new(&path);
    store.update_state("2024-01-03").await.unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let reloaded = WatermarkStore::from_file(&path).unwrap();
    assert_eq!(reloaded.get_last_state().await.unwrap(), "2024-01-03");
    assert!(reloaded.state().await.updated_at.is_some());
}

#[tokio::test]
async fn test_failed_write_keeps_previous_watermark() {
    let dir = tempdir().unwrap();
    // A file where the state directory should be makes every write fail
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let store = WatermarkStore::new(blocker.join("state.json")).with_initial(Some(date(2024, 1, 1)));

    let err = store.advance_to(date(2024, 1, 3)).await.unwrap_err();
    assert!(matches!(err, Error::State { .. }));
    assert_eq!(store.get_last_state().await.unwrap(), "2024-01-01");
    assert_eq!(store.state().await, WatermarkState::new());

    assert!(store.reset_to(date(2024, 2, 1)).await.is_err());
    assert_eq!(store.get_last_state().await.unwrap(), "2024-01-01");
}

#[tokio::test]
async fn test_persisted_value_wins_over_initial() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, r#"{"last_run_date": "2024-02-01"}"#).unwrap();

    let store = WatermarkStore::from_file(&path)
        .unwrap()
        .with_initial(Some(date(2024, 1, 1)));
    assert_eq!(store.get_last_state().await.unwrap(), "2024-02-01");
}

#[tokio::test]
async fn test_load_picks_up_external_change() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = WatermarkStore::new(&path);
    store.update_state("2024-01-01").await.unwrap();

    std::fs::write(&path, r#"{"last_run_date": "2024-01-09"}"#).unwrap();
    store.load().await.unwrap();
    assert_eq!(store.get_last_state().await.unwrap(), "2024-01-09");
}

#[tokio::test]
async fn test_clone_shares_state() {
    let store = WatermarkStore::in_memory();
    let clone = store.clone();
    store.update_state("2024-01-02").await.unwrap();
    assert_eq!(clone.get_last_state().await.unwrap(), "2024-01-02");
}
