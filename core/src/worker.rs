// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Execution of claimed sync tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::collection::{LocalCollection, PassOptions};
use crate::error::{RemoteError, SyncError};
use crate::remote::RemoteFactory;
use crate::scheduler::{Claim, InMemoryQueue, SyncTask};
use crate::store::LocalStore;
use crate::types::{Account, Authority};

/// How a task run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    Success,
    /// Something failed that may work later; retry with backoff.
    Retry,
    /// Something failed that will not go away by retrying.
    Failure,
}

impl TaskResult {
    fn merge(self, other: TaskResult) -> TaskResult {
        match (self, other) {
            (TaskResult::Retry, _) | (_, TaskResult::Retry) => TaskResult::Retry,
            (TaskResult::Failure, _) | (_, TaskResult::Failure) => TaskResult::Failure,
            _ => TaskResult::Success,
        }
    }
}

type PassLocks = Mutex<HashMap<(Account, Authority), Arc<tokio::sync::Mutex<()>>>>;

/// Runs sync tasks against the local store and the account's remote.
///
/// Tasks of the same account and authority, such as a one-time and a
/// periodic sync, run one after the other.
#[derive(Clone)]
pub struct SyncWorker {
    store: Arc<dyn LocalStore>,
    remotes: Arc<dyn RemoteFactory>,
    passes: Arc<PassLocks>,
}

impl fmt::Debug for SyncWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncWorker")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl SyncWorker {
    pub fn new(store: Arc<dyn LocalStore>, remotes: Arc<dyn RemoteFactory>) -> Self {
        Self {
            store,
            remotes,
            passes: Arc::default(),
        }
    }

    fn pass_lock(&self, task: &SyncTask) -> Arc<tokio::sync::Mutex<()>> {
        let mut passes = self.passes.lock().unwrap_or_else(PoisonError::into_inner);
        passes
            .entry((task.account.clone(), task.authority))
            .or_default()
            .clone()
    }

    /// Synchronizes every enabled collection of the task's account and
    /// authority, one pass each.
    ///
    /// A failing collection does not stop the others. The task is retried
    /// when any collection may succeed later, even if another one failed for
    /// good.
    #[tracing::instrument(skip_all, fields(task = %task.name(), manual = task.manual))]
    pub async fn run(&self, task: &SyncTask) -> TaskResult {
        let lock = self.pass_lock(task);
        let _pass = lock.lock().await;

        let remote = match self.remotes.remote(&task.account) {
            Ok(remote) => remote,
            Err(err) => {
                tracing::error!(%err, "no remote for account");
                return TaskResult::Failure;
            }
        };

        let collections = match self.store.collections(&task.account, task.authority).await {
            Ok(collections) => collections,
            Err(err) => {
                tracing::error!(%err, "failed to list collections");
                return if err.is_retryable() {
                    TaskResult::Retry
                } else {
                    TaskResult::Failure
                };
            }
        };

        let options = PassOptions {
            resync: task.resync,
            upload_only: task.upload,
        };

        let mut result = TaskResult::Success;
        for info in collections.into_iter().filter(|c| c.sync_enabled) {
            let url = info.url.clone();
            let mut collection = LocalCollection::new(self.store.clone(), info);
            let outcome = match collection.synchronize(remote.as_ref(), options).await {
                Ok(report) => {
                    tracing::info!(
                        %url,
                        pushed = report.pushed,
                        deleted = report.deleted,
                        pulled = report.pulled_new + report.pulled_updated,
                        removed = report.removed + report.pruned,
                        failures = report.failures.len(),
                        "collection synchronized"
                    );
                    let retry = report
                        .failures
                        .iter()
                        .any(|failure| matches!(failure.error, RemoteError::Failure(_)));
                    if retry {
                        TaskResult::Retry
                    } else {
                        TaskResult::Success
                    }
                }
                Err(err) => {
                    tracing::warn!(%url, %err, "collection sync failed");
                    pass_result(&err)
                }
            };
            result = result.merge(outcome);
        }
        result
    }

    /// Runs every due task of `queue` concurrently and reports the results
    /// back to the queue. Returns how many tasks ran.
    pub async fn run_due(&self, queue: &InMemoryQueue) -> usize {
        let claims = queue.claim_due().await;
        let count = claims.len();

        let handles: Vec<_> = claims
            .into_iter()
            .map(|claim| {
                let worker = self.clone();
                let task = claim.spec.task.clone();
                let handle = tokio::spawn(async move { worker.run(&task).await });
                (claim, handle)
            })
            .collect();

        for (claim, handle) in handles {
            let result = handle.await.unwrap_or_else(|err| {
                tracing::error!(task = %claim.name, %err, "sync task panicked");
                TaskResult::Retry
            });
            finish(queue, &claim, result).await;
        }
        count
    }
}

fn pass_result(err: &SyncError) -> TaskResult {
    if err.is_retryable() {
        TaskResult::Retry
    } else {
        TaskResult::Failure
    }
}

async fn finish(queue: &InMemoryQueue, claim: &Claim, result: TaskResult) {
    match result {
        TaskResult::Success => queue.complete(claim).await,
        TaskResult::Retry => queue.fail(claim, true).await,
        TaskResult::Failure => queue.fail(claim, false).await,
    }
}
