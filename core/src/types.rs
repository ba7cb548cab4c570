// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::schema::{CONTACTS, EVENTS, ResourceSchema, TASKS};

/// Identity of a synchronized account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Account name, usually the login.
    pub name: String,

    /// Account type, distinguishing accounts of different providers.
    #[serde(default = "default_account_kind")]
    pub kind: String,
}

fn default_account_kind() -> String {
    "davsync".to_string()
}

impl Account {
    /// Creates an account of the default type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_account_kind(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Category of data synchronized independently per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Authority {
    /// Calendar events.
    #[cfg_attr(feature = "clap", clap(name = "calendar", alias = "calendars"))]
    Calendar,

    /// Address book contacts.
    #[cfg_attr(feature = "clap", clap(name = "contacts", alias = "contact"))]
    Contacts,

    /// Task lists.
    #[cfg_attr(feature = "clap", clap(name = "tasks", alias = "task"))]
    Tasks,
}

impl Authority {
    /// Every authority, in fan-out order.
    pub const ALL: [Authority; 3] = [Authority::Calendar, Authority::Contacts, Authority::Tasks];

    /// Stable string form used in task names and storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Authority::Calendar => "calendar",
            Authority::Contacts => "contacts",
            Authority::Tasks => "tasks",
        }
    }

    /// The resource kind collections of this authority hold by default.
    #[must_use]
    pub fn default_kind(self) -> ResourceKind {
        match self {
            Authority::Calendar => ResourceKind::Event,
            Authority::Contacts => ResourceKind::Contact,
            Authority::Tasks => ResourceKind::Task,
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Authority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calendar" => Ok(Authority::Calendar),
            "contacts" => Ok(Authority::Contacts),
            "tasks" => Ok(Authority::Tasks),
            _ => Err(format!("unknown authority: {s}")),
        }
    }
}

/// Kind of resource stored in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// iCalendar events.
    Event,
    /// vCard contacts.
    Contact,
    /// iCalendar to-dos.
    Task,
}

impl ResourceKind {
    /// Stable string form used in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Event => "event",
            ResourceKind::Contact => "contact",
            ResourceKind::Task => "task",
        }
    }

    /// Column mapping of the table holding resources of this kind.
    #[must_use]
    pub fn schema(self) -> &'static ResourceSchema {
        match self {
            ResourceKind::Event => &EVENTS,
            ResourceKind::Contact => &CONTACTS,
            ResourceKind::Task => &TASKS,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(ResourceKind::Event),
            "contact" => Ok(ResourceKind::Contact),
            "task" => Ok(ResourceKind::Task),
            _ => Err(format!("unknown resource kind: {s}")),
        }
    }
}

/// How much of the regular change detection a pass bypasses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Resync {
    /// Regular pass: skip pulling when the collection tag is unchanged.
    #[default]
    #[cfg_attr(feature = "clap", clap(skip))]
    None,

    /// Ignore the collection tag and compare every member's entity tag.
    #[cfg_attr(feature = "clap", clap(name = "list"))]
    ListOnly,

    /// Ignore all stored tags, download every member again and prune
    /// local resources the server no longer lists.
    #[cfg_attr(feature = "clap", clap(name = "full"))]
    Full,
}
