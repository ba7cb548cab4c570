// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test data factories for integration tests.

use davsync_core::{Account, Authority, NewCollection, ResourceKind};

/// A minimal iCalendar body holding one event.
///
/// Lines are separated by `\n` only, as they come back from the mock
/// server's XML unchanged.
#[must_use]
pub fn ical_event(uid: &str, summary: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nUID:{uid}\nSUMMARY:{summary}\nEND:VEVENT\nEND:VCALENDAR\n"
    )
}

/// An enabled event calendar of `alice` at `url`.
#[must_use]
pub fn calendar_collection(url: &str) -> NewCollection {
    NewCollection {
        account: Account::new("alice"),
        authority: Authority::Calendar,
        kind: ResourceKind::Event,
        url: url.to_string(),
        sync_enabled: true,
    }
}

/// A config file with one account talking to `base_url`.
#[must_use]
pub fn config_toml(state_dir: &str, base_url: &str) -> String {
    format!(
        r#"
state_dir = '{state_dir}'

[scheduler]
base_backoff_secs = 10
periodic_interval_secs = 3600

[[accounts]]
name = "alice"

[accounts.server]
base_url = "{base_url}"

[[accounts.collections]]
url = "/dav/cal/"
authority = "calendar"

[[accounts.collections]]
url = "/dav/todo/"
authority = "tasks"
sync = false
"#
    )
}
