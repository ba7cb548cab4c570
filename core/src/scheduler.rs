// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Scheduling of sync tasks per account and authority.
//!
//! [`SyncScheduler`] turns sync requests into [`TaskSpec`]s and hands them to
//! a [`TaskQueue`], choosing the [`ExistingPolicy`] that keeps at most one
//! one-time and one periodic task per account and authority.

mod backoff;
mod clock;
mod notify;
mod queue;
mod task;

use std::sync::Arc;
use std::time::Duration;

pub use crate::scheduler::backoff::BackoffPolicy;
pub use crate::scheduler::clock::{Clock, ManualClock, SystemClock};
pub use crate::scheduler::notify::{LogNotifier, SyncNotifier};
pub use crate::scheduler::queue::{
    Claim, ExistingPolicy, InMemoryQueue, SubmitOutcome, TaskInfo, TaskQueue, TaskState,
};
pub use crate::scheduler::task::{
    Constraints, NetworkRequirement, NetworkState, SyncTask, TaskMode, TaskSpec, task_name,
};

use crate::error::SchedulerError;
use crate::types::{Account, Authority, Resync};

/// Shortest interval accepted for periodic tasks.
pub const MIN_PERIODIC_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Initial delay of a periodic task registered with
/// [`SyncScheduler::restart_periodic`].
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Flags of a one-time sync request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncRequest {
    pub manual: bool,
    pub resync: Resync,
    pub upload: bool,
    pub from_push: bool,
}

#[derive(Debug, Clone)]
pub struct SyncScheduler {
    queue: Arc<dyn TaskQueue>,
    notifier: Arc<dyn SyncNotifier>,
    tasks_available: bool,
}

impl SyncScheduler {
    pub fn new(queue: Arc<dyn TaskQueue>, notifier: Arc<dyn SyncNotifier>) -> Self {
        Self {
            queue,
            notifier,
            tasks_available: true,
        }
    }

    /// Whether task lists are synchronized at all.
    #[must_use]
    pub fn with_tasks_available(mut self, available: bool) -> Self {
        self.tasks_available = available;
        self
    }

    pub fn queue(&self) -> &Arc<dyn TaskQueue> {
        &self.queue
    }

    /// Authorities a sync of a whole account covers.
    pub fn authorities(&self) -> Vec<Authority> {
        Authority::ALL
            .into_iter()
            .filter(|authority| self.tasks_available || *authority != Authority::Tasks)
            .collect()
    }

    /// Requests a one-time sync and returns the name of the task.
    ///
    /// If the same sync is already pending the request is dropped, so a
    /// retry in progress is never cancelled by a later trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue refuses the task.
    #[tracing::instrument(skip(self, request))]
    pub async fn enqueue_one_time(
        &self,
        account: &Account,
        authority: Authority,
        request: SyncRequest,
    ) -> Result<String, SchedulerError> {
        let task = SyncTask {
            manual: request.manual,
            resync: request.resync,
            upload: request.upload,
            from_push: request.from_push,
            ..SyncTask::one_time(account.clone(), authority)
        };
        let name = task.name();

        if request.from_push {
            self.notifier.sync_pending(account, authority);
        }

        let outcome = self
            .queue
            .submit(TaskSpec::once(task), ExistingPolicy::Keep)
            .await?;
        tracing::debug!(task = %name, ?outcome, "one-time sync requested");
        Ok(name)
    }

    /// Requests a one-time sync for every authority of `account`.
    ///
    /// A refused authority does not keep the others from being enqueued;
    /// each result is reported in order.
    pub async fn enqueue_one_time_all_authorities(
        &self,
        account: &Account,
        request: SyncRequest,
    ) -> Vec<(Authority, Result<String, SchedulerError>)> {
        let mut results = Vec::new();
        for authority in self.authorities() {
            let result = self.enqueue_one_time(account, authority, request).await;
            if let Err(err) = &result {
                tracing::warn!(%account, %authority, %err, "failed to enqueue sync");
            }
            results.push((authority, result));
        }
        results
    }

    /// Registers the periodic sync, or updates the registered one.
    ///
    /// An update only changes the definition: a run in progress continues and
    /// the following runs use the new interval and constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is shorter than
    /// [`MIN_PERIODIC_INTERVAL`] or the queue refuses the task.
    pub async fn enable_periodic(
        &self,
        account: &Account,
        authority: Authority,
        interval: Duration,
        wifi_only: bool,
    ) -> Result<SubmitOutcome, SchedulerError> {
        let spec = periodic_spec(account, authority, interval, wifi_only)?;
        self.queue.submit(spec, ExistingPolicy::Update).await
    }

    /// Registers the periodic sync from scratch, first running after a short
    /// delay instead of a full interval.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is shorter than
    /// [`MIN_PERIODIC_INTERVAL`] or the queue refuses the task.
    pub async fn restart_periodic(
        &self,
        account: &Account,
        authority: Authority,
        interval: Duration,
        wifi_only: bool,
    ) -> Result<SubmitOutcome, SchedulerError> {
        let spec = periodic_spec(account, authority, interval, wifi_only)?
            .with_initial_delay(RESTART_DELAY);
        self.queue.submit(spec, ExistingPolicy::CancelAndReenqueue).await
    }

    /// Removes the periodic sync. Returns whether one was registered.
    pub async fn disable_periodic(&self, account: &Account, authority: Authority) -> bool {
        let name = task_name(TaskMode::Periodic, account, authority);
        self.queue.cancel(&name).await
    }

    /// Cancels every one-time and periodic task of `account`.
    ///
    /// Returns how many pending tasks were cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_all_work(&self, account: &Account) -> usize {
        let mut cancelled = 0;
        for authority in Authority::ALL {
            for mode in [TaskMode::OneTime, TaskMode::Periodic] {
                if self.queue.cancel(&task_name(mode, account, authority)).await {
                    cancelled += 1;
                }
            }
        }
        tracing::info!(cancelled, "cancelled all work");
        cancelled
    }

    /// Pending tasks of `account`.
    pub async fn pending(&self, account: &Account) -> Vec<TaskInfo> {
        self.queue
            .tasks()
            .await
            .into_iter()
            .filter(|info| info.is_pending() && &info.spec.task.account == account)
            .collect()
    }
}

fn periodic_spec(
    account: &Account,
    authority: Authority,
    interval: Duration,
    wifi_only: bool,
) -> Result<TaskSpec, SchedulerError> {
    if interval < MIN_PERIODIC_INTERVAL {
        return Err(SchedulerError::Rejected {
            name: task_name(TaskMode::Periodic, account, authority),
            reason: format!(
                "interval {interval:?} is shorter than the minimum {MIN_PERIODIC_INTERVAL:?}"
            ),
        });
    }

    Ok(TaskSpec::every(
        SyncTask::periodic(account.clone(), authority),
        interval,
        Constraints::unmetered(wifi_only),
    ))
}
