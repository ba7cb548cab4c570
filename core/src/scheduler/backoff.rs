// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Exponential retry delay for failed tasks.
///
/// The first retry waits `base`, every further failure doubles the delay.
/// There is no upper bound; an overflowing delay saturates at [`Duration::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
}

impl BackoffPolicy {
    /// Base delay used when none is configured.
    pub const DEFAULT_BASE: Duration = Duration::from_secs(30);

    #[must_use]
    pub const fn exponential(base: Duration) -> Self {
        Self { base }
    }

    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    /// Delay before the retry following `failures` consecutive failures.
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::exponential(Self::DEFAULT_BASE)
    }
}
