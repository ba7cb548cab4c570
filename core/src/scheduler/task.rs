// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display};
use std::time::Duration;

use crate::types::{Account, Authority, Resync};

/// Whether a task runs once or on an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskMode {
    OneTime,
    Periodic,
}

impl TaskMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskMode::OneTime => "onetime",
            TaskMode::Periodic => "periodic",
        }
    }
}

impl Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the name identifying the task of `mode` for `account` and `authority`.
///
/// Equal inputs always give the same name, the queue uses it to spot duplicates.
pub fn task_name(mode: TaskMode, account: &Account, authority: Authority) -> String {
    format!("{mode}-sync {authority} {account}")
}

/// One synchronization request for an account and authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTask {
    pub account: Account,
    pub authority: Authority,
    pub mode: TaskMode,
    /// Requested by the user rather than triggered automatically.
    pub manual: bool,
    pub resync: Resync,
    /// Only push local changes, do not pull.
    pub upload: bool,
    /// Triggered by a server push notification.
    pub from_push: bool,
}

impl SyncTask {
    pub fn one_time(account: Account, authority: Authority) -> Self {
        Self {
            account,
            authority,
            mode: TaskMode::OneTime,
            manual: false,
            resync: Resync::None,
            upload: false,
            from_push: false,
        }
    }

    pub fn periodic(account: Account, authority: Authority) -> Self {
        Self {
            mode: TaskMode::Periodic,
            ..Self::one_time(account, authority)
        }
    }

    pub fn name(&self) -> String {
        task_name(self.mode, &self.account, self.authority)
    }
}

/// Network state a task needs before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkRequirement {
    /// Any connection.
    #[default]
    Connected,
    /// A connection that is not metered, e.g. Wi-Fi.
    Unmetered,
}

/// The network connectivity observed by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkState {
    Offline,
    Metered,
    #[default]
    Unmetered,
}

impl NetworkState {
    pub fn satisfies(self, requirement: NetworkRequirement) -> bool {
        match (self, requirement) {
            (NetworkState::Offline, _) => false,
            (NetworkState::Metered, NetworkRequirement::Unmetered) => false,
            (NetworkState::Metered | NetworkState::Unmetered, _) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Constraints {
    pub network: NetworkRequirement,
}

impl Constraints {
    pub const fn unmetered(wifi_only: bool) -> Self {
        Self {
            network: if wifi_only {
                NetworkRequirement::Unmetered
            } else {
                NetworkRequirement::Connected
            },
        }
    }
}

/// A task together with how the queue should run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub task: SyncTask,
    pub constraints: Constraints,
    /// Delay before the first run.
    pub initial_delay: Duration,
    /// Repeat interval, set for periodic tasks only.
    pub interval: Option<Duration>,
}

impl TaskSpec {
    pub fn once(task: SyncTask) -> Self {
        Self {
            task,
            constraints: Constraints::default(),
            initial_delay: Duration::ZERO,
            interval: None,
        }
    }

    pub fn every(task: SyncTask, interval: Duration, constraints: Constraints) -> Self {
        Self {
            task,
            constraints,
            initial_delay: interval,
            interval: Some(interval),
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn name(&self) -> String {
        self.task.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_name_is_deterministic() {
        let alice = Account::new("alice");
        let a = task_name(TaskMode::OneTime, &alice, Authority::Calendar);
        let b = SyncTask::one_time(Account::new("alice"), Authority::Calendar).name();
        assert_eq!(a, b);
        assert_eq!(a, "onetime-sync calendar davsync/alice");
    }

    #[test]
    fn task_name_differs_by_mode_account_and_authority() {
        let alice = Account::new("alice");
        let bob = Account::new("bob");
        let names = [
            task_name(TaskMode::OneTime, &alice, Authority::Calendar),
            task_name(TaskMode::Periodic, &alice, Authority::Calendar),
            task_name(TaskMode::OneTime, &alice, Authority::Contacts),
            task_name(TaskMode::OneTime, &bob, Authority::Calendar),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in names.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn network_state_satisfies_requirements() {
        use NetworkRequirement::{Connected, Unmetered};
        assert!(!NetworkState::Offline.satisfies(Connected));
        assert!(NetworkState::Metered.satisfies(Connected));
        assert!(!NetworkState::Metered.satisfies(Unmetered));
        assert!(NetworkState::Unmetered.satisfies(Unmetered));
    }
}
