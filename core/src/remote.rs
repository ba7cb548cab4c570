// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The server side of a reconciliation pass.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::record::{Collection, ResourceContent, ResourceRow};
use crate::token::{CollectionTag, EntityTag};
use crate::types::Account;

/// A member of a remote collection as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub etag: Option<EntityTag>,
}

/// A downloaded remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResource {
    pub name: String,
    pub etag: Option<EntityTag>,
    /// Unique identifier found in the body, if any.
    pub uid: Option<String>,
    pub content: ResourceContent,
}

/// Result of asking the server for changes since a known collection tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteChanges {
    /// The collection tag matches the known one; nothing to pull.
    Unchanged,

    /// The collection may have changed; `entries` lists every member.
    Changed {
        /// Current collection tag; `None` if the server does not provide one.
        ctag: Option<CollectionTag>,
        display_name: Option<String>,
        entries: Vec<RemoteEntry>,
    },
}

/// Server operations a pass relies on.
///
/// Implementations map their transport errors onto [`RemoteError`]; a write
/// rejected because the server copy changed is a [`RemoteError::Conflict`].
#[async_trait]
pub trait Remote: Send + Sync {
    /// Writes a resource and returns the entity tag the server assigned.
    ///
    /// Resources without an entity tag are created and must not overwrite an
    /// existing member; others must only replace the version they were based on.
    async fn upload(
        &self,
        collection: &Collection,
        resource: &ResourceRow,
        content: &ResourceContent,
    ) -> Result<Option<EntityTag>, RemoteError>;

    /// Removes a resource. A resource that is already gone counts as removed.
    async fn delete(&self, collection: &Collection, resource: &ResourceRow)
    -> Result<(), RemoteError>;

    /// Lists the collection unless its tag still equals `known`.
    async fn fetch_changes(
        &self,
        collection: &Collection,
        known: Option<&CollectionTag>,
    ) -> Result<RemoteChanges, RemoteError>;

    /// Downloads the named members. Members the server cannot deliver are
    /// left out of the result.
    async fn download(
        &self,
        collection: &Collection,
        names: &[String],
    ) -> Result<Vec<RemoteResource>, RemoteError>;
}

/// Provides the [`Remote`] serving an account.
pub trait RemoteFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if no remote is configured for `account`.
    fn remote(&self, account: &Account) -> Result<Arc<dyn Remote>, RemoteError>;
}
