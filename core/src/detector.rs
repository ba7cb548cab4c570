// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Classification of local rows into new, updated and deleted.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::record::{CollectionId, LocalId, ResourceRow, RowChanges};
use crate::schema::ResourceSchema;
use crate::store::{Filter, LocalStore, Presence};

/// Extra condition a caller applies on top of every detector query.
pub type RowPredicate = Arc<dyn Fn(&ResourceRow) -> bool + Send + Sync>;

/// Upper bound of suffixed candidates tried for one remote name.
const MAX_NAME_ATTEMPTS: usize = 64;

/// Local changes of a collection, as seen at the start of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalChanges {
    pub new: Vec<ResourceRow>,
    pub updated: Vec<ResourceRow>,
    pub deleted: Vec<ResourceRow>,
}

impl LocalChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Queries the local store for rows that need to be pushed.
#[derive(Clone)]
pub struct ChangeDetector {
    store: Arc<dyn LocalStore>,
    schema: &'static ResourceSchema,
    collection: CollectionId,
    predicate: Option<RowPredicate>,
}

impl fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("table", &self.schema.table)
            .field("collection", &self.collection)
            .field("predicate", &self.predicate.is_some())
            .finish_non_exhaustive()
    }
}

impl ChangeDetector {
    pub fn new(
        store: Arc<dyn LocalStore>,
        schema: &'static ResourceSchema,
        collection: CollectionId,
    ) -> Self {
        Self {
            store,
            schema,
            collection,
            predicate: None,
        }
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: Option<RowPredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Runs all three queries.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub async fn detect(&self) -> Result<LocalChanges, StoreError> {
        Ok(LocalChanges {
            new: self.find_new().await?,
            updated: self.find_updated().await?,
            deleted: self.find_deleted().await?,
        })
    }

    /// Rows that were never uploaded: dirty, without entity tag, not deleted.
    ///
    /// Every returned row carries a unique identifier and a remote name. Rows
    /// lacking them are assigned both first, each with a single-row update,
    /// so calling this again returns the same values.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[tracing::instrument(skip(self), fields(table = self.schema.table, collection = %self.collection))]
    pub async fn find_new(&self) -> Result<Vec<ResourceRow>, StoreError> {
        let filter = Filter::collection(self.collection)
            .dirty(true)
            .etag(Presence::Null)
            .deleted(false);

        let mut rows = self.scan(&filter).await?;
        for row in &mut rows {
            self.ensure_identity(row).await?;
        }
        tracing::debug!(count = rows.len(), "found new resources");
        Ok(rows)
    }

    /// Rows modified since their last upload: dirty, with entity tag, not deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn find_updated(&self) -> Result<Vec<ResourceRow>, StoreError> {
        let filter = Filter::collection(self.collection)
            .dirty(true)
            .etag(Presence::NotNull)
            .deleted(false);
        self.scan(&filter).await
    }

    /// Rows deleted locally and not yet removed remotely.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn find_deleted(&self) -> Result<Vec<ResourceRow>, StoreError> {
        let filter = Filter::collection(self.collection).deleted(true);
        self.scan(&filter).await
    }

    /// Every row of the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn find_all(&self) -> Result<Vec<ResourceRow>, StoreError> {
        self.scan(&Filter::collection(self.collection)).await
    }

    async fn scan(&self, filter: &Filter) -> Result<Vec<ResourceRow>, StoreError> {
        let mut rows = self.store.query(self.schema, filter).await?;
        if let Some(predicate) = &self.predicate {
            rows.retain(|r| predicate(r));
        }
        Ok(rows)
    }

    async fn ensure_identity(&self, row: &mut ResourceRow) -> Result<(), StoreError> {
        if row.uid.is_some() && row.remote_name.is_some() {
            return Ok(());
        }

        let uid = row.uid.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let remote_name = match &row.remote_name {
            Some(name) => name.clone(),
            None => self.unique_remote_name(&uid, row.id).await?,
        };

        let changes = RowChanges {
            uid: Some(uid.clone()),
            remote_name: Some(remote_name.clone()),
            ..Default::default()
        };
        if self.store.update_row(self.schema, row.id, &changes).await? == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(id = %row.id, %uid, %remote_name, "assigned identity to new resource");

        row.uid = Some(uid);
        row.remote_name = Some(remote_name);
        Ok(())
    }

    /// Derives a remote name from `uid` that no other row of the collection uses.
    async fn unique_remote_name(&self, uid: &str, id: LocalId) -> Result<String, StoreError> {
        let base = sanitize_file_stem(uid);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                format!("{base}.{}", self.schema.extension)
            } else {
                format!("{base}-{attempt}.{}", self.schema.extension)
            };

            let filter = Filter::collection(self.collection).remote_name(candidate.as_str());
            let taken = self
                .store
                .query(self.schema, &filter)
                .await?
                .iter()
                .any(|r| r.id != id);
            if !taken {
                return Ok(candidate);
            }
        }

        Err(StoreError::ConstraintViolation(format!(
            "no free remote name for uid {uid}"
        )))
    }
}

/// Keeps characters that are safe in a URL path segment.
fn sanitize_file_stem(uid: &str) -> String {
    let stem: String = uid
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.trim_matches('.').is_empty() {
        Uuid::new_v4().to_string()
    } else {
        stem
    }
}
