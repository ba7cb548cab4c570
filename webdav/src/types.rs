// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

/// Resource href (path).
///
/// A `Href` represents the path to a resource on a `WebDAV` server,
/// such as `/calendars/user/personal/event1.ics`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Href(String);

impl Href {
    /// Creates a new `Href` from a string.
    #[must_use]
    pub const fn new(href: String) -> Self {
        Self(href)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins a member file name onto a collection href, percent-encoding
    /// the name.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let name = urlencoding::encode(name);
        if self.0.ends_with('/') {
            Self(format!("{}{name}", self.0))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    /// The last path segment, i.e. the member file name inside its
    /// collection, percent-decoded.
    ///
    /// Servers may list `a@b.ics` as `a%40b.ics`; both yield the same name.
    /// A segment that does not decode to UTF-8 is returned as is.
    #[must_use]
    pub fn file_name(&self) -> Option<Cow<'_, str>> {
        let segment = self
            .0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|a| !a.is_empty())?;
        Some(urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
    }

    /// Whether both hrefs address the same collection, ignoring a trailing slash.
    #[must_use]
    pub fn same_collection(&self, other: &Href) -> bool {
        self.0.trim_end_matches('/') == other.0.trim_end_matches('/')
    }
}

impl Deref for Href {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Href {
    fn from(href: String) -> Self {
        Self(href)
    }
}

impl From<&str> for Href {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

/// Entity tag for change detection.
///
/// An `ETag` represents an entity tag returned by the server, used for
/// optimistic concurrency control and change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETag(String);

impl ETag {
    /// Creates a new `ETag` from a string.
    #[must_use]
    pub const fn new(etag: String) -> Self {
        Self(etag)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the tag, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for ETag {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ETag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ETag {
    fn from(etag: String) -> Self {
        Self(etag)
    }
}

impl From<&str> for ETag {
    fn from(etag: &str) -> Self {
        Self(etag.to_string())
    }
}

/// Which `WebDAV` extension a collection belongs to.
///
/// Decides the multiget report and the data property used to transfer
/// resource bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceFlavor {
    /// `CalDAV` calendar or task list, bodies are iCalendar.
    Calendar,
    /// `CardDAV` address book, bodies are vCard.
    AddressBook,
}

impl ResourceFlavor {
    /// MIME type sent with `PUT` requests.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Calendar => "text/calendar; charset=utf-8",
            Self::AddressBook => "text/vcard; charset=utf-8",
        }
    }
}

/// A member of a collection, as reported by a depth-1 `PROPFIND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    /// The href of the member.
    pub href: Href,
    /// The entity tag of the member, if the server reported one.
    pub etag: Option<ETag>,
}

/// A downloaded resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResource {
    /// The href of the resource.
    pub href: Href,
    /// The entity tag of the resource.
    pub etag: Option<ETag>,
    /// The raw body (iCalendar or vCard text).
    pub data: String,
}

impl DavResource {
    /// Creates a new `DavResource`.
    #[must_use]
    pub const fn new(href: Href, etag: Option<ETag>, data: String) -> Self {
        Self { href, etag, data }
    }
}
