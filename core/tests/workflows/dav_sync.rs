// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Sync passes of a SQLite-backed collection against a mock `CalDAV` server.

use std::sync::Arc;

use davsync_core::{
    CollectionTag, EntityTag, LocalCollection, LocalDb, LocalStore, NewResource, PassOptions,
    RemoteError, ResourceContent, Resync, RowChanges, SyncPhase,
};

use crate::common::{DavServer, calendar_collection, ical_event, setup_temp_dirs};

async fn open_collection(db: &Arc<LocalDb>, url: &str) -> LocalCollection {
    let info = db
        .upsert_collection(&calendar_collection(url))
        .await
        .expect("Failed to create collection");
    LocalCollection::new(db.clone(), info)
}

#[tokio::test]
async fn dav_sync_pulls_server_collection_into_database() {
    // Arrange
    let dirs = setup_temp_dirs().await.unwrap();
    let db = Arc::new(LocalDb::open(Some(&dirs.database_path())).await.unwrap());
    let mut collection = open_collection(&db, "/dav/cal/").await;

    let server = DavServer::start().await;
    let standup = ical_event("standup", "Standup");
    let review = ical_event("review", "Review");
    server.mount_state("/dav/cal/", "c1", "Work").await;
    server
        .mount_members("/dav/cal/", &[("a.ics", "\"a1\""), ("b.ics", "\"b1\"")], None)
        .await;
    server
        .mount_multiget(
            "/dav/cal/",
            &[("a.ics", "\"a1\"", &standup), ("b.ics", "\"b1\"", &review)],
        )
        .await;

    // Act
    let report = collection
        .synchronize(&server.remote(), PassOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(report.pulled_new, 2);
    assert!(report.ctag_updated);
    assert!(report.is_clean());
    assert_eq!(collection.phase(), SyncPhase::Done);

    let a = collection.find_by_remote_name("a.ics", true).await.unwrap();
    assert_eq!(a.row.etag, Some(EntityTag::from("\"a1\"")));
    assert_eq!(a.row.uid.as_deref(), Some("standup"));
    assert!(!a.row.dirty);
    assert!(a.content.unwrap().body.contains("SUMMARY:Standup"));

    let stored = db.collection(collection.id()).await.unwrap();
    assert_eq!(stored.ctag, Some(CollectionTag::from("c1")));
    assert_eq!(stored.display_name.as_deref(), Some("Work"));
}

#[tokio::test]
async fn dav_sync_unchanged_ctag_does_not_list_again() {
    // Arrange
    let db = Arc::new(LocalDb::open(None).await.unwrap());
    let mut collection = open_collection(&db, "/dav/cal/").await;

    let server = DavServer::start().await;
    server.mount_state("/dav/cal/", "c1", "Work").await;
    server.mount_members("/dav/cal/", &[], Some(1)).await;

    // Act
    let first = collection
        .synchronize(&server.remote(), PassOptions::default())
        .await
        .unwrap();
    let second = collection
        .synchronize(&server.remote(), PassOptions::default())
        .await
        .unwrap();

    // Assert
    assert!(first.ctag_updated);
    assert!(second.pull_skipped);
    assert!(!second.ctag_updated);
}

#[tokio::test]
async fn dav_sync_pushes_local_creation() {
    // Arrange
    let db = Arc::new(LocalDb::open(None).await.unwrap());
    let mut collection = open_collection(&db, "/dav/cal/").await;
    let mut batch = collection.begin();
    collection.add(
        &mut batch,
        NewResource {
            uid: Some("lunch".to_string()),
            dirty: true,
            content: ResourceContent::new(ical_event("lunch", "Lunch")),
            ..Default::default()
        },
    );
    collection.commit(batch).await.unwrap();

    let server = DavServer::start().await;
    server.mount_create("/dav/cal/", "\"n1\"").await;
    server.mount_state("/dav/cal/", "c2", "Work").await;
    server
        .mount_members("/dav/cal/", &[("lunch.ics", "\"n1\"")], None)
        .await;

    // Act
    let report = collection
        .synchronize(&server.remote(), PassOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(report.pushed, 1);
    assert_eq!(report.pulled_new + report.pulled_updated, 0);
    let lunch = collection.find_by_remote_name("lunch.ics", false).await.unwrap();
    assert_eq!(lunch.row.etag, Some(EntityTag::from("\"n1\"")));
    assert!(!lunch.row.dirty);
    assert!(collection.find_new().await.unwrap().is_empty());

    let bodies = server.uploaded_bodies().await;
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("UID:lunch"));
}

#[tokio::test]
async fn dav_sync_conflict_keeps_local_edit_dirty() {
    // Arrange
    let db = Arc::new(LocalDb::open(None).await.unwrap());
    let mut collection = open_collection(&db, "/dav/cal/").await;
    let mut batch = collection.begin();
    collection.add(
        &mut batch,
        NewResource {
            remote_name: Some("a.ics".to_string()),
            etag: Some(EntityTag::from("\"stale\"")),
            uid: Some("a".to_string()),
            dirty: true,
            content: ResourceContent::new(ical_event("a", "Mine")),
        },
    );
    collection.commit(batch).await.unwrap();

    let server = DavServer::start().await;
    server.mount_conflict("/dav/cal/a.ics").await;
    server.mount_state("/dav/cal/", "c3", "Work").await;
    server
        .mount_members("/dav/cal/", &[("a.ics", "\"theirs\"")], None)
        .await;

    // Act
    let report = collection
        .synchronize(&server.remote(), PassOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "a.ics");
    assert!(matches!(report.failures[0].error, RemoteError::Conflict(_)));
    let a = collection.find_by_remote_name("a.ics", true).await.unwrap();
    assert!(a.row.dirty);
    assert_eq!(a.row.etag, Some(EntityTag::from("\"stale\"")));
    assert!(a.content.unwrap().body.contains("SUMMARY:Mine"));
}

#[tokio::test]
async fn dav_sync_local_deletion_and_server_removal() {
    // Arrange
    let db = Arc::new(LocalDb::open(None).await.unwrap());
    let mut collection = open_collection(&db, "/dav/cal/").await;
    let mut batch = collection.begin();
    for name in ["gone.ics", "vanished.ics", "kept.ics"] {
        collection.add(
            &mut batch,
            NewResource {
                remote_name: Some(name.to_string()),
                etag: Some(EntityTag::from("\"1\"")),
                uid: Some(name.to_string()),
                content: ResourceContent::new("BEGIN:VCALENDAR\nEND:VCALENDAR\n"),
                ..Default::default()
            },
        );
    }
    collection.commit(batch).await.unwrap();
    let gone = collection.find_by_remote_name("gone.ics", false).await.unwrap();
    db.update_row(
        collection.info().kind.schema(),
        gone.row.id,
        &RowChanges {
            deleted: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let server = DavServer::start().await;
    server.mount_delete("/dav/cal/gone.ics").await;
    server.mount_state("/dav/cal/", "c4", "Work").await;
    server
        .mount_members("/dav/cal/", &[("kept.ics", "\"1\"")], None)
        .await;

    // Act
    let report = collection
        .synchronize(&server.remote(), PassOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(report.deleted, 1);
    assert_eq!(report.removed, 1);
    let names: Vec<_> = collection
        .detector()
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|r| r.remote_name)
        .collect();
    assert_eq!(names, vec!["kept.ics".to_string()]);
}

#[tokio::test]
async fn dav_sync_full_resync_prunes_unlisted_rows() {
    // Arrange
    let db = Arc::new(LocalDb::open(None).await.unwrap());
    let mut collection = open_collection(&db, "/dav/cal/").await;
    let mut batch = collection.begin();
    collection.add(
        &mut batch,
        NewResource {
            remote_name: Some("orphan.ics".to_string()),
            content: ResourceContent::new("BEGIN:VCALENDAR\nEND:VCALENDAR\n"),
            ..Default::default()
        },
    );
    collection.commit(batch).await.unwrap();

    let server = DavServer::start().await;
    let body = ical_event("a", "A");
    server.mount_state("/dav/cal/", "c5", "Work").await;
    server
        .mount_members("/dav/cal/", &[("a.ics", "\"a1\"")], None)
        .await;
    server
        .mount_multiget("/dav/cal/", &[("a.ics", "\"a1\"", &body)])
        .await;

    // Act
    let report = collection
        .synchronize(
            &server.remote(),
            PassOptions {
                resync: Resync::Full,
                upload_only: false,
            },
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(report.pulled_new, 1);
    assert_eq!(report.pruned, 1);
    assert!(collection.find_by_remote_name("orphan.ics", false).await.is_err());
    assert!(collection.find_by_remote_name("a.ics", false).await.is_ok());
}

#[tokio::test]
async fn dav_sync_matches_percent_encoded_member_names() {
    // Arrange
    let db = Arc::new(LocalDb::open(None).await.unwrap());
    let mut collection = open_collection(&db, "/dav/cal/").await;
    let mut batch = collection.begin();
    collection.add(
        &mut batch,
        NewResource {
            uid: Some("a@b".to_string()),
            dirty: true,
            content: ResourceContent::new(ical_event("a@b", "Dinner")),
            ..Default::default()
        },
    );
    collection.commit(batch).await.unwrap();

    let server = DavServer::start().await;
    server.mount_create("/dav/cal/", "\"n1\"").await;
    server.mount_state("/dav/cal/", "c6", "Work").await;
    server
        .mount_members("/dav/cal/", &[("a%40b.ics", "\"n1\"")], None)
        .await;

    // Act
    let first = collection
        .synchronize(&server.remote(), PassOptions::default())
        .await
        .unwrap();
    let full = collection
        .synchronize(
            &server.remote(),
            PassOptions {
                resync: Resync::Full,
                upload_only: false,
            },
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(first.pushed, 1);
    for report in [&first, &full] {
        assert_eq!(report.pulled_new + report.pulled_updated, 0);
        assert_eq!(report.removed + report.pruned, 0);
        assert!(report.is_clean());
    }

    let put_paths: Vec<String> = server
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(put_paths, vec!["/dav/cal/a%40b.ics".to_string()]);

    let row = collection.find_by_remote_name("a@b.ics", false).await.unwrap();
    assert_eq!(row.row.etag, Some(EntityTag::from("\"n1\"")));
    assert!(!row.row.dirty);
}
