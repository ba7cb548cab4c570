// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;

use crate::types::{Account, Authority};

/// Receives user-facing hints about scheduled work.
pub trait SyncNotifier: Debug + Send + Sync {
    /// A push-triggered sync for `account` and `authority` is about to be
    /// enqueued.
    fn sync_pending(&self, account: &Account, authority: Authority);
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl SyncNotifier for LogNotifier {
    fn sync_pending(&self, account: &Account, authority: Authority) {
        tracing::info!(%account, %authority, "sync pending");
    }
}
