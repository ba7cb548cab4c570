// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Scheduler, worker and store driven together against a mock server.

use std::sync::Arc;
use std::time::Duration;

use davsync_core::scheduler::{InMemoryQueue, LogNotifier, ManualClock, NetworkState, TaskState};
use davsync_core::{
    Account, Authority, DavRemotes, Filter, LocalDb, LocalStore, SyncRequest, SyncScheduler,
    SyncWorker,
};

use crate::common::{DavServer, calendar_collection, ical_event};

struct Harness {
    db: Arc<LocalDb>,
    clock: Arc<ManualClock>,
    queue: Arc<InMemoryQueue>,
    scheduler: SyncScheduler,
    worker: SyncWorker,
}

async fn harness(server: &DavServer) -> Harness {
    let db = Arc::new(LocalDb::open(None).await.unwrap());
    db.upsert_collection(&calendar_collection("/dav/cal/"))
        .await
        .unwrap();

    let clock = Arc::new(ManualClock::default());
    let queue = Arc::new(InMemoryQueue::new(clock.clone(), Default::default()));
    let scheduler = SyncScheduler::new(queue.clone(), Arc::new(LogNotifier));
    let remotes = DavRemotes::new([(Account::new("alice"), server.config())]).unwrap();
    let worker = SyncWorker::new(db.clone(), Arc::new(remotes));
    Harness {
        db,
        clock,
        queue,
        scheduler,
        worker,
    }
}

async fn mount_one_event(server: &DavServer) {
    let body = ical_event("standup", "Standup");
    server.mount_state("/dav/cal/", "c1", "Work").await;
    server
        .mount_members("/dav/cal/", &[("a.ics", "\"a1\"")], None)
        .await;
    server
        .mount_multiget("/dav/cal/", &[("a.ics", "\"a1\"", &body)])
        .await;
}

#[tokio::test]
async fn scheduled_one_time_sync_pulls_and_leaves_queue() {
    // Arrange
    let server = DavServer::start().await;
    mount_one_event(&server).await;
    let h = harness(&server).await;
    let alice = Account::new("alice");

    // Act
    h.scheduler
        .enqueue_one_time(&alice, Authority::Calendar, SyncRequest::default())
        .await
        .unwrap();
    let ran = h.worker.run_due(&h.queue).await;

    // Assert
    assert_eq!(ran, 1);
    assert!(h.scheduler.pending(&alice).await.is_empty());
    let rows = h
        .db
        .query(Authority::Calendar.default_kind().schema(), &Filter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].uid.as_deref(), Some("standup"));
}

#[tokio::test]
async fn scheduled_periodic_sync_waits_for_interval_and_network() {
    // Arrange
    let server = DavServer::start().await;
    mount_one_event(&server).await;
    let h = harness(&server).await;
    let alice = Account::new("alice");
    let interval = Duration::from_secs(3600);
    h.scheduler
        .enable_periodic(&alice, Authority::Calendar, interval, true)
        .await
        .unwrap();

    // Act & Assert: not due before the first interval
    assert_eq!(h.worker.run_due(&h.queue).await, 0);

    // due, but the network is metered
    h.clock.advance(interval);
    h.queue.set_network(NetworkState::Metered).await;
    assert_eq!(h.worker.run_due(&h.queue).await, 0);

    // unmetered network, the task runs and stays registered
    h.queue.set_network(NetworkState::Unmetered).await;
    assert_eq!(h.worker.run_due(&h.queue).await, 1);

    let pending = h.scheduler.pending(&alice).await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].state, TaskState::Enqueued);
    assert_eq!(pending[0].next_run.as_second(), 2 * 3600);
}

#[tokio::test]
async fn scheduled_sync_retries_unreachable_server() {
    // Arrange: nothing mounted, every request fails with 404
    let server = DavServer::start().await;
    let h = harness(&server).await;
    let alice = Account::new("alice");
    h.scheduler
        .enqueue_one_time(&alice, Authority::Calendar, SyncRequest::default())
        .await
        .unwrap();

    // Act
    assert_eq!(h.worker.run_due(&h.queue).await, 1);

    // Assert
    let pending = h.scheduler.pending(&alice).await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempt, 1);
    assert_eq!(pending[0].next_run.as_second(), 30);

    // the retry is not due until the backoff has elapsed
    assert_eq!(h.worker.run_due(&h.queue).await, 0);
    h.clock.advance(Duration::from_secs(30));
    assert_eq!(h.worker.run_due(&h.queue).await, 1);
    assert_eq!(h.scheduler.pending(&alice).await[0].attempt, 2);
}

#[tokio::test]
async fn scheduled_cancel_all_work_drops_pending_tasks() {
    // Arrange
    let server = DavServer::start().await;
    let h = harness(&server).await;
    let alice = Account::new("alice");
    let results = h
        .scheduler
        .enqueue_one_time_all_authorities(&alice, SyncRequest::default())
        .await;
    assert!(results.iter().all(|(_, r)| r.is_ok()));
    h.scheduler
        .enable_periodic(&alice, Authority::Calendar, Duration::from_secs(3600), false)
        .await
        .unwrap();

    // Act
    let cancelled = h.scheduler.cancel_all_work(&alice).await;

    // Assert
    assert_eq!(cancelled, 4);
    assert_eq!(h.worker.run_due(&h.queue).await, 0);
    assert!(h.scheduler.pending(&alice).await.is_empty());
}
