// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::Mutex;

use crate::error::SchedulerError;
use crate::scheduler::backoff::BackoffPolicy;
use crate::scheduler::clock::{self, Clock};
use crate::scheduler::task::{NetworkState, TaskMode, TaskSpec};

/// What to do when a task with the same name is already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingPolicy {
    /// Drop the new request.
    Keep,
    /// Replace the definition of the pending task, keeping its schedule.
    Update,
    /// Cancel the pending task and enqueue the new one from scratch.
    CancelAndReenqueue,
}

/// What [`TaskQueue::submit`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No task with this name was pending; a new one was enqueued.
    Enqueued,
    /// A pending task was kept and the request dropped.
    Kept,
    /// The pending task's definition was replaced.
    Updated,
    /// The pending task was cancelled and the request enqueued.
    Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for its run time and constraints.
    Enqueued,
    /// Claimed by a worker.
    Running,
    /// Cancelled while running; it is dropped once the run ends.
    Cancelled,
}

/// Snapshot of a task known to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: String,
    pub spec: TaskSpec,
    pub state: TaskState,
    /// Earliest time the task may run next.
    pub next_run: Timestamp,
    /// Consecutive failed runs.
    pub attempt: u32,
}

impl TaskInfo {
    /// Whether the task still waits to run or is running.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, TaskState::Enqueued | TaskState::Running)
    }
}

/// Deduplicating queue of sync tasks, keyed by task name.
#[async_trait]
pub trait TaskQueue: Debug + Send + Sync {
    /// Submits a task, resolving a name clash with `policy`.
    async fn submit(
        &self,
        spec: TaskSpec,
        policy: ExistingPolicy,
    ) -> Result<SubmitOutcome, SchedulerError>;

    /// Cancels the named task. Returns whether a pending task was found.
    ///
    /// A running task is not interrupted but will not run again.
    async fn cancel(&self, name: &str) -> bool;

    /// Replaces the definition of a pending task with the same name.
    ///
    /// The schedule of the pending task is kept. Returns `false` if no such
    /// task is pending.
    async fn replace_if_pending(&self, spec: TaskSpec) -> bool;

    async fn get(&self, name: &str) -> Option<TaskInfo>;

    async fn tasks(&self) -> Vec<TaskInfo>;
}

/// A task handed to a worker by [`InMemoryQueue::claim_due`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub name: String,
    pub spec: TaskSpec,
    /// Failed runs before this one.
    pub attempt: u32,
    generation: u64,
}

#[derive(Debug)]
struct Entry {
    spec: TaskSpec,
    state: TaskState,
    next_run: Timestamp,
    attempt: u32,
    generation: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    network: NetworkState,
    next_generation: u64,
    shut_down: bool,
}

/// A [`TaskQueue`] held in memory and driven by a [`Clock`].
#[derive(Debug, Clone)]
pub struct InMemoryQueue {
    clock: Arc<dyn Clock>,
    backoff: BackoffPolicy,
    state: Arc<Mutex<State>>,
}

impl InMemoryQueue {
    pub fn new(clock: Arc<dyn Clock>, backoff: BackoffPolicy) -> Self {
        Self {
            clock,
            backoff,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub async fn set_network(&self, network: NetworkState) {
        self.state.lock().await.network = network;
    }

    /// Rejects further submissions and stops handing out tasks.
    pub async fn shut_down(&self) {
        self.state.lock().await.shut_down = true;
    }

    /// Marks every due task whose constraints hold as running and returns them.
    pub async fn claim_due(&self) -> Vec<Claim> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        if state.shut_down {
            return Vec::new();
        }

        let network = state.network;
        let mut claims = Vec::new();
        for (name, entry) in &mut state.entries {
            let due = entry.state == TaskState::Enqueued && entry.next_run <= now;
            if due && network.satisfies(entry.spec.constraints.network) {
                entry.state = TaskState::Running;
                claims.push(Claim {
                    name: name.clone(),
                    spec: entry.spec.clone(),
                    attempt: entry.attempt,
                    generation: entry.generation,
                });
            }
        }
        claims
    }

    /// Records a successful run.
    ///
    /// One-time tasks leave the queue; periodic tasks are due again one
    /// interval later.
    pub async fn complete(&self, claim: &Claim) {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let Some(entry) = Self::claimed_entry(&mut state, claim) else {
            return;
        };

        let reschedule = (entry.state == TaskState::Running)
            .then_some(entry.spec.interval)
            .flatten();
        if let Some(interval) = reschedule {
            entry.state = TaskState::Enqueued;
            entry.attempt = 0;
            entry.next_run = clock::add(now, interval);
        } else {
            state.entries.remove(&claim.name);
        }
    }

    /// Records a failed run.
    ///
    /// A retryable failure schedules the task again after the backoff delay.
    /// Otherwise a one-time task is dropped and a periodic task waits for its
    /// next interval.
    pub async fn fail(&self, claim: &Claim, retryable: bool) {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let Some(entry) = Self::claimed_entry(&mut state, claim) else {
            return;
        };

        if entry.state == TaskState::Cancelled {
            state.entries.remove(&claim.name);
            return;
        }

        if retryable {
            entry.attempt = entry.attempt.saturating_add(1);
            let delay = self.backoff.delay(entry.attempt);
            tracing::debug!(task = %claim.name, attempt = entry.attempt, ?delay, "retrying task with backoff");
            entry.state = TaskState::Enqueued;
            entry.next_run = clock::add(now, delay);
        } else if let Some(interval) = entry.spec.interval {
            entry.state = TaskState::Enqueued;
            entry.attempt = 0;
            entry.next_run = clock::add(now, interval);
        } else {
            state.entries.remove(&claim.name);
        }
    }

    /// The entry `claim` was taken from, unless it has been replaced since.
    fn claimed_entry<'a>(state: &'a mut State, claim: &Claim) -> Option<&'a mut Entry> {
        match state.entries.get_mut(&claim.name) {
            Some(entry) if entry.generation == claim.generation => Some(entry),
            _ => {
                tracing::debug!(task = %claim.name, "ignoring result of a replaced task");
                None
            }
        }
    }

    fn validate(spec: &TaskSpec) -> Result<(), SchedulerError> {
        let reason = match (spec.task.mode, spec.interval) {
            (TaskMode::Periodic, None) => "periodic task without an interval",
            (TaskMode::Periodic, Some(interval)) if interval.is_zero() => {
                "periodic task with a zero interval"
            }
            (TaskMode::OneTime, Some(_)) => "one-time task with an interval",
            _ => return Ok(()),
        };
        Err(SchedulerError::Rejected {
            name: spec.name(),
            reason: reason.to_string(),
        })
    }

    fn insert(&self, state: &mut State, name: String, spec: TaskSpec) {
        state.next_generation += 1;
        let next_run = clock::add(self.clock.now(), spec.initial_delay);
        state.entries.insert(
            name,
            Entry {
                spec,
                state: TaskState::Enqueued,
                next_run,
                attempt: 0,
                generation: state.next_generation,
            },
        );
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    #[tracing::instrument(skip(self, spec), fields(task = %spec.name()))]
    async fn submit(
        &self,
        spec: TaskSpec,
        policy: ExistingPolicy,
    ) -> Result<SubmitOutcome, SchedulerError> {
        Self::validate(&spec)?;

        let mut state = self.state.lock().await;
        if state.shut_down {
            return Err(SchedulerError::ShutDown);
        }

        let name = spec.name();
        let pending = state
            .entries
            .get(&name)
            .is_some_and(|entry| entry.state != TaskState::Cancelled);

        let outcome = match (pending, policy) {
            (false, _) => {
                self.insert(&mut state, name, spec);
                SubmitOutcome::Enqueued
            }
            (true, ExistingPolicy::Keep) => SubmitOutcome::Kept,
            (true, ExistingPolicy::Update) => {
                if let Some(entry) = state.entries.get_mut(&name) {
                    entry.spec = spec;
                }
                SubmitOutcome::Updated
            }
            (true, ExistingPolicy::CancelAndReenqueue) => {
                self.insert(&mut state, name, spec);
                SubmitOutcome::Replaced
            }
        };
        tracing::debug!(?policy, ?outcome, "task submitted");
        Ok(outcome)
    }

    async fn cancel(&self, name: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(entry) = state.entries.get_mut(name) else {
            return false;
        };

        let current = entry.state;
        match current {
            TaskState::Enqueued => {
                state.entries.remove(name);
                tracing::debug!(task = name, "task cancelled");
                true
            }
            TaskState::Running => {
                entry.state = TaskState::Cancelled;
                tracing::debug!(task = name, "running task will not be rescheduled");
                true
            }
            TaskState::Cancelled => false,
        }
    }

    async fn replace_if_pending(&self, spec: TaskSpec) -> bool {
        let mut state = self.state.lock().await;
        match state.entries.get_mut(&spec.name()) {
            Some(entry) if entry.state != TaskState::Cancelled => {
                entry.spec = spec;
                true
            }
            _ => false,
        }
    }

    async fn get(&self, name: &str) -> Option<TaskInfo> {
        let state = self.state.lock().await;
        state.entries.get(name).map(|entry| info(name, entry))
    }

    async fn tasks(&self) -> Vec<TaskInfo> {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .map(|(name, entry)| info(name, entry))
            .collect()
    }
}

fn info(name: &str, entry: &Entry) -> TaskInfo {
    TaskInfo {
        name: name.to_string(),
        spec: entry.spec.clone(),
        state: entry.state,
        next_run: entry.next_run,
        attempt: entry.attempt,
    }
}
