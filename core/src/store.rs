// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Abstraction over the local record store.

mod memory;

use std::fmt::Debug;

use async_trait::async_trait;

pub use crate::store::memory::MemoryStore;

use crate::batch::{Mutation, MutationOutcome};
use crate::error::StoreError;
use crate::record::{
    Collection, CollectionId, LocalId, NewCollection, ResourceContent, ResourceRow, RowChanges,
};
use crate::schema::ResourceSchema;
use crate::token::CollectionTag;
use crate::types::{Account, Authority};

/// Whether a nullable column must be null or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Null,
    NotNull,
}

impl Presence {
    pub(crate) fn matches<T>(self, value: Option<&T>) -> bool {
        match self {
            Presence::Null => value.is_none(),
            Presence::NotNull => value.is_some(),
        }
    }
}

/// Conditions on resource rows; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub collection: Option<CollectionId>,
    pub id: Option<LocalId>,
    pub remote_name: Option<String>,
    pub etag: Option<Presence>,
    pub dirty: Option<bool>,
    pub deleted: Option<bool>,
}

impl Filter {
    /// Every row of a collection.
    #[must_use]
    pub fn collection(collection: CollectionId) -> Self {
        Self {
            collection: Some(collection),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn id(mut self, id: LocalId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn remote_name(mut self, name: impl Into<String>) -> Self {
        self.remote_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn etag(mut self, presence: Presence) -> Self {
        self.etag = Some(presence);
        self
    }

    #[must_use]
    pub fn dirty(mut self, dirty: bool) -> Self {
        self.dirty = Some(dirty);
        self
    }

    #[must_use]
    pub fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = Some(deleted);
        self
    }

    /// Evaluates the filter against a row in memory.
    #[must_use]
    pub fn matches(&self, row: &ResourceRow) -> bool {
        self.collection.is_none_or(|c| c == row.collection)
            && self.id.is_none_or(|id| id == row.id)
            && self
                .remote_name
                .as_deref()
                .is_none_or(|n| row.remote_name.as_deref() == Some(n))
            && self.etag.is_none_or(|p| p.matches(row.etag.as_ref()))
            && self.dirty.is_none_or(|d| d == row.dirty)
            && self.deleted.is_none_or(|d| d == row.deleted)
    }
}

/// Transactional store of collections and their resources.
///
/// Resource operations take the [`ResourceSchema`] of the table they act on.
#[async_trait]
pub trait LocalStore: Debug + Send + Sync {
    /// Rows matching `filter`, ordered by local id.
    async fn query(
        &self,
        schema: &'static ResourceSchema,
        filter: &Filter,
    ) -> Result<Vec<ResourceRow>, StoreError>;

    /// Body and ordered data rows of a resource.
    ///
    /// Returns [`StoreError::NotFound`] if the row does not exist.
    async fn load_content(
        &self,
        schema: &'static ResourceSchema,
        id: LocalId,
    ) -> Result<ResourceContent, StoreError>;

    /// Applies `changes` to a single row immediately, outside any batch.
    ///
    /// Returns the number of affected rows.
    async fn update_row(
        &self,
        schema: &'static ResourceSchema,
        id: LocalId,
        changes: &RowChanges,
    ) -> Result<usize, StoreError>;

    /// Applies all mutations as one atomic unit.
    ///
    /// Either every mutation takes effect or none does. The outcomes are
    /// returned in mutation order.
    async fn apply_batch(
        &self,
        schema: &'static ResourceSchema,
        mutations: &[Mutation],
    ) -> Result<Vec<MutationOutcome>, StoreError>;

    /// Deletes every row of `collection` whose remote name is set and not in
    /// `keep`, in a single statement. Rows without a remote name are kept.
    async fn delete_except_remote_names(
        &self,
        schema: &'static ResourceSchema,
        collection: CollectionId,
        keep: &[String],
    ) -> Result<usize, StoreError>;

    /// Registers a collection, or returns the existing one bound to the same
    /// account and location.
    async fn upsert_collection(&self, collection: &NewCollection) -> Result<Collection, StoreError>;

    async fn collection(&self, id: CollectionId) -> Result<Collection, StoreError>;

    /// Collections of `account` under `authority`, ordered by id.
    async fn collections(
        &self,
        account: &Account,
        authority: Authority,
    ) -> Result<Vec<Collection>, StoreError>;

    /// Removes a collection together with all of its resources.
    async fn remove_collection(&self, id: CollectionId) -> Result<(), StoreError>;

    async fn set_ctag(
        &self,
        id: CollectionId,
        ctag: Option<&CollectionTag>,
    ) -> Result<(), StoreError>;

    async fn update_metadata(
        &self,
        id: CollectionId,
        display_name: Option<&str>,
        color: Option<&str>,
    ) -> Result<(), StoreError>;
}
