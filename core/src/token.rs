// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Opaque version tokens issued by the server.
//!
//! Tokens are compared for equality only; their content carries no meaning.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Version token of a single resource, as last seen from the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTag(String);

impl EntityTag {
    /// Creates a new entity tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the tag and returns the raw token.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for EntityTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Version token of a whole collection.
///
/// It changes whenever any member of the collection changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionTag(String);

impl CollectionTag {
    /// Creates a new collection tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the tag and returns the raw token.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for CollectionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CollectionTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CollectionTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
