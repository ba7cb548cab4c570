// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration-driven workflow tests.
//!
//! These tests load a config file from disk and register its collections in
//! a fresh database.

use std::time::Duration;

use davsync_core::{Account, Authority, Config, ConfigError, LocalDb, LocalStore, ResourceKind};

use crate::common::{config_toml, setup_temp_dirs};

#[tokio::test]
async fn config_load_from_explicit_path() {
    // Arrange
    let dirs = setup_temp_dirs().await.unwrap();
    let state_dir = dirs.state_dir.to_str().unwrap();
    let path = dirs
        .write_config(&config_toml(state_dir, "http://localhost:5232"))
        .await
        .unwrap();

    // Act
    let config = Config::load(Some(path)).await.unwrap();

    // Assert
    assert_eq!(config.state_dir.as_deref(), Some(dirs.state_dir.as_path()));
    assert_eq!(config.database_path(), Some(dirs.database_path()));
    assert_eq!(config.scheduler.backoff().base(), Duration::from_secs(10));
    assert_eq!(
        config.scheduler.periodic_interval(),
        Some(Duration::from_secs(3600))
    );

    let alice = config.account("alice").expect("alice should be configured");
    assert_eq!(alice.account(), Account::new("alice"));
    assert_eq!(alice.server.base_url, "http://localhost:5232");
    let collections = alice.new_collections();
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[1].authority, Authority::Tasks);
    assert_eq!(collections[1].kind, ResourceKind::Task);
    assert!(!collections[1].sync_enabled);
}

#[tokio::test]
async fn config_missing_file_is_io_error() {
    let dirs = setup_temp_dirs().await.unwrap();

    let err = Config::load(Some(dirs.config_dir.join("missing.toml")))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
}

#[tokio::test]
async fn config_invalid_toml_is_parse_error() {
    let dirs = setup_temp_dirs().await.unwrap();
    let path = dirs.write_config("accounts = 42").await.unwrap();

    let err = Config::load(Some(path)).await.unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[tokio::test]
async fn config_collections_registered_idempotently() {
    // Arrange
    let dirs = setup_temp_dirs().await.unwrap();
    let state_dir = dirs.state_dir.to_str().unwrap();
    let path = dirs
        .write_config(&config_toml(state_dir, "http://localhost:5232"))
        .await
        .unwrap();
    let config = Config::load(Some(path)).await.unwrap();
    let db_path = config.database_path().unwrap();

    // Act
    for _ in 0..2 {
        let db = LocalDb::open(Some(&db_path)).await.unwrap();
        for account in &config.accounts {
            for collection in account.new_collections() {
                db.upsert_collection(&collection).await.unwrap();
            }
        }
        db.close().await;
    }

    // Assert
    let db = LocalDb::open(Some(&db_path)).await.unwrap();
    let alice = Account::new("alice");
    let calendars = db.collections(&alice, Authority::Calendar).await.unwrap();
    let tasks = db.collections(&alice, Authority::Tasks).await.unwrap();
    assert_eq!(calendars.len(), 1);
    assert_eq!(calendars[0].url, "/dav/cal/");
    assert!(calendars[0].sync_enabled);
    assert_eq!(tasks.len(), 1);
    assert!(!tasks[0].sync_enabled);
}
