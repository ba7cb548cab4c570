// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! SQLite implementation of [`LocalStore`].

mod collections;
mod resources;


use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::batch::{Mutation, MutationOutcome};
use crate::error::StoreError;
use crate::localdb::collections::Collections;
use crate::localdb::resources::Resources;
use crate::record::{
    Collection, CollectionId, LocalId, NewCollection, ResourceContent, ResourceRow, RowChanges,
};
use crate::schema::ResourceSchema;
use crate::store::{Filter, LocalStore};
use crate::token::CollectionTag;
use crate::types::{Account, Authority};

/// Distinguishes in-memory databases, which would otherwise be private to
/// each pooled connection.
pub(crate) static IN_MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
pub struct LocalDb {
    pool: SqlitePool,
    collections: Collections,
    resources: Resources,
}

impl LocalDb {
    /// Opens a sqlite database connection.
    /// If `filename` is `None`, it opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(filename: Option<&Path>) -> Result<Self, StoreError> {
        let options = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "connecting to SQLite database");
            if let Some(dir) = filename.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    StoreError::Unavailable(format!("failed to create {}: {e}", dir.display()))
                })?;
            }
            SqliteConnectOptions::new()
                .filename(filename)
                .create_if_missing(true)
        } else {
            tracing::info!("connecting to in-memory SQLite database");
            let db_id = IN_MEMORY_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
            SqliteConnectOptions::new()
                .filename(format!("file:memdb_{db_id}:?mode=memory&cache=shared"))
                .in_memory(true)
                .create_if_missing(true)
        };

        let pool = SqlitePoolOptions::new()
            .connect_with(options.foreign_keys(true))
            .await
            .map_err(|e| {
                StoreError::Unavailable(format!("failed to connect to SQLite database: {e}"))
            })?;

        sqlx::migrate!("src/localdb/migrations") // relative path from the crate root
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to run migrations: {e}")))?;

        Ok(LocalDb {
            collections: Collections::new(pool.clone()),
            resources: Resources::new(pool.clone()),
            pool,
        })
    }

    pub async fn close(self) {
        tracing::debug!("closing database connection");
        self.pool.close().await;
    }
}

#[async_trait]
impl LocalStore for LocalDb {
    async fn query(
        &self,
        schema: &'static ResourceSchema,
        filter: &Filter,
    ) -> Result<Vec<ResourceRow>, StoreError> {
        Ok(self.resources.query(schema, filter).await?)
    }

    async fn load_content(
        &self,
        schema: &'static ResourceSchema,
        id: LocalId,
    ) -> Result<ResourceContent, StoreError> {
        self.resources
            .load_content(schema, id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn update_row(
        &self,
        schema: &'static ResourceSchema,
        id: LocalId,
        changes: &RowChanges,
    ) -> Result<usize, StoreError> {
        Ok(self.resources.update_row(schema, id, changes).await?)
    }

    async fn apply_batch(
        &self,
        schema: &'static ResourceSchema,
        mutations: &[Mutation],
    ) -> Result<Vec<MutationOutcome>, StoreError> {
        self.resources.apply_batch(schema, mutations).await
    }

    async fn delete_except_remote_names(
        &self,
        schema: &'static ResourceSchema,
        collection: CollectionId,
        keep: &[String],
    ) -> Result<usize, StoreError> {
        Ok(self
            .resources
            .delete_except_remote_names(schema, collection, keep)
            .await?)
    }

    async fn upsert_collection(&self, collection: &NewCollection) -> Result<Collection, StoreError> {
        self.collections.upsert(collection).await
    }

    async fn collection(&self, id: CollectionId) -> Result<Collection, StoreError> {
        self.collections.get(id).await
    }

    async fn collections(
        &self,
        account: &Account,
        authority: Authority,
    ) -> Result<Vec<Collection>, StoreError> {
        self.collections.list(account, authority).await
    }

    async fn remove_collection(&self, id: CollectionId) -> Result<(), StoreError> {
        self.collections.remove(id).await
    }

    async fn set_ctag(
        &self,
        id: CollectionId,
        ctag: Option<&CollectionTag>,
    ) -> Result<(), StoreError> {
        self.collections.set_ctag(id, ctag).await
    }

    async fn update_metadata(
        &self,
        id: CollectionId,
        display_name: Option<&str>,
        color: Option<&str>,
    ) -> Result<(), StoreError> {
        self.collections.update_metadata(id, display_name, color).await
    }
}
