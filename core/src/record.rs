// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::{CollectionTag, EntityTag};
use crate::types::{Account, Authority, ResourceKind};

/// Local primary key of a resource row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub i64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local primary key of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub i64);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sync metadata of one local resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRow {
    pub id: LocalId,
    pub collection: CollectionId,
    /// File name on the server, assigned before the first upload.
    pub remote_name: Option<String>,
    /// Entity tag last received from the server; `None` if never synced.
    pub etag: Option<EntityTag>,
    pub uid: Option<String>,
    /// Modified locally since the last successful push.
    pub dirty: bool,
    /// Deleted locally but not yet removed from the server.
    pub deleted: bool,
}

/// One ordered key/value row attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRow {
    pub key: String,
    pub value: String,
}

impl DataRow {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Full content of a resource: its serialized body plus its data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceContent {
    pub body: String,
    pub data_rows: Vec<DataRow>,
}

impl ResourceContent {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            data_rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_rows.push(DataRow::new(key, value));
        self
    }
}

/// A resource row, optionally populated with its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalResource {
    pub row: ResourceRow,
    pub content: Option<ResourceContent>,
}

/// Values of a resource about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRow {
    pub collection: CollectionId,
    pub remote_name: Option<String>,
    pub etag: Option<EntityTag>,
    pub uid: Option<String>,
    pub dirty: bool,
    pub body: String,
}

/// Columns to change on an existing resource row; `None` leaves a column alone.
///
/// Nullable columns take `Some(None)` to be cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowChanges {
    pub remote_name: Option<String>,
    pub etag: Option<Option<EntityTag>>,
    pub uid: Option<String>,
    pub dirty: Option<bool>,
    pub deleted: Option<bool>,
    pub body: Option<String>,
}

impl RowChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &RowChanges::default()
    }
}

/// A local collection bound to a remote collection of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: CollectionId,
    pub account: Account,
    pub authority: Authority,
    pub kind: ResourceKind,
    /// Location of the remote collection.
    pub url: String,
    /// Collection tag stored after the last successful pull.
    pub ctag: Option<CollectionTag>,
    pub sync_enabled: bool,
    pub display_name: Option<String>,
    pub color: Option<String>,
}

/// Binding of a remote collection to be registered in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    pub account: Account,
    pub authority: Authority,
    pub kind: ResourceKind,
    pub url: String,
    pub sync_enabled: bool,
}
