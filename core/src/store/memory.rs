// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::batch::{Mutation, MutationOutcome, resolve_owner};
use crate::error::StoreError;
use crate::record::{
    Collection, CollectionId, DataRow, LocalId, NewCollection, ResourceContent, ResourceRow,
    RowChanges,
};
use crate::schema::ResourceSchema;
use crate::store::{Filter, LocalStore};
use crate::token::CollectionTag;
use crate::types::{Account, Authority};

/// Volatile [`LocalStore`] kept entirely in memory.
///
/// Batches are applied to a copy of the affected table which replaces the
/// original only when every mutation succeeded. Failures can be injected to
/// exercise rollback paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<CollectionId, Collection>,
    tables: HashMap<&'static str, Table>,
    next_collection_id: i64,
    unavailable: bool,
    fail_batch_at: Option<usize>,
    reject_batch: bool,
}

#[derive(Debug, Clone, Default)]
struct Table {
    rows: BTreeMap<LocalId, StoredRow>,
    next_id: i64,
}

#[derive(Debug, Clone)]
struct StoredRow {
    row: ResourceRow,
    body: String,
    data_rows: Vec<DataRow>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following operation fail with [`StoreError::Unavailable`]
    /// until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Makes the next batch fail when it reaches the mutation at `index`.
    pub async fn fail_next_batch_at(&self, index: usize) {
        self.state.lock().await.fail_batch_at = Some(index);
    }

    /// Like [`Self::fail_next_batch_at`], but with a constraint violation,
    /// which is not worth retrying.
    pub async fn reject_next_batch_at(&self, index: usize) {
        let mut state = self.state.lock().await;
        state.fail_batch_at = Some(index);
        state.reject_batch = true;
    }
}

impl State {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn collection_mut(&mut self, id: CollectionId) -> Result<&mut Collection, StoreError> {
        self.collections.get_mut(&id).ok_or(StoreError::NotFound)
    }
}

impl Table {
    fn ensure_unique_name(
        &self,
        collection: CollectionId,
        name: Option<&str>,
        except: Option<LocalId>,
    ) -> Result<(), StoreError> {
        let Some(name) = name else {
            return Ok(());
        };
        let taken = self.rows.values().any(|r| {
            Some(r.row.id) != except
                && r.row.collection == collection
                && r.row.remote_name.as_deref() == Some(name)
        });
        if taken {
            Err(StoreError::ConstraintViolation(format!(
                "remote name {name} already used in collection {collection}"
            )))
        } else {
            Ok(())
        }
    }

    fn update(&mut self, id: LocalId, changes: &RowChanges) -> Result<usize, StoreError> {
        let Some(collection) = self.rows.get(&id).map(|r| r.row.collection) else {
            return Ok(0);
        };
        if changes.remote_name.is_some() {
            self.ensure_unique_name(collection, changes.remote_name.as_deref(), Some(id))?;
        }

        let Some(stored) = self.rows.get_mut(&id) else {
            return Ok(0);
        };
        if let Some(name) = &changes.remote_name {
            stored.row.remote_name = Some(name.clone());
        }
        if let Some(etag) = &changes.etag {
            stored.row.etag.clone_from(etag);
        }
        if let Some(uid) = &changes.uid {
            stored.row.uid = Some(uid.clone());
        }
        if let Some(dirty) = changes.dirty {
            stored.row.dirty = dirty;
        }
        if let Some(deleted) = changes.deleted {
            stored.row.deleted = deleted;
        }
        if let Some(body) = &changes.body {
            stored.body.clone_from(body);
        }
        Ok(1)
    }

    fn apply(
        &mut self,
        collections: &BTreeMap<CollectionId, Collection>,
        mutation: &Mutation,
        applied: &[MutationOutcome],
    ) -> Result<MutationOutcome, StoreError> {
        let outcome = match mutation {
            Mutation::Insert(new) => {
                if !collections.contains_key(&new.collection) {
                    return Err(StoreError::ConstraintViolation(format!(
                        "collection {} does not exist",
                        new.collection
                    )));
                }
                self.ensure_unique_name(new.collection, new.remote_name.as_deref(), None)?;

                self.next_id += 1;
                let id = LocalId(self.next_id);
                let row = ResourceRow {
                    id,
                    collection: new.collection,
                    remote_name: new.remote_name.clone(),
                    etag: new.etag.clone(),
                    uid: new.uid.clone(),
                    dirty: new.dirty,
                    deleted: false,
                };
                self.rows.insert(
                    id,
                    StoredRow {
                        row,
                        body: new.body.clone(),
                        data_rows: Vec::new(),
                    },
                );
                MutationOutcome::Inserted(id)
            }
            Mutation::Update { id, changes } => MutationOutcome::Affected(self.update(*id, changes)?),
            Mutation::Delete { id } => {
                MutationOutcome::Affected(usize::from(self.rows.remove(id).is_some()))
            }
            Mutation::InsertData { owner, row } => {
                let owner = resolve_owner(*owner, applied)?;
                let stored = self.rows.get_mut(&owner).ok_or_else(|| {
                    StoreError::ConstraintViolation(format!("resource {owner} does not exist"))
                })?;
                stored.data_rows.push(row.clone());
                MutationOutcome::Affected(1)
            }
            Mutation::DeleteData { owner } => {
                let removed = self
                    .rows
                    .get_mut(owner)
                    .map_or(0, |stored| std::mem::take(&mut stored.data_rows).len());
                MutationOutcome::Affected(removed)
            }
        };
        Ok(outcome)
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn query(
        &self,
        schema: &'static ResourceSchema,
        filter: &Filter,
    ) -> Result<Vec<ResourceRow>, StoreError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .tables
            .get(schema.table)
            .map(|t| {
                t.rows
                    .values()
                    .filter(|r| filter.matches(&r.row))
                    .map(|r| r.row.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn load_content(
        &self,
        schema: &'static ResourceSchema,
        id: LocalId,
    ) -> Result<ResourceContent, StoreError> {
        let state = self.state.lock().await;
        state.check_available()?;
        let stored = state
            .tables
            .get(schema.table)
            .and_then(|t| t.rows.get(&id))
            .ok_or(StoreError::NotFound)?;
        Ok(ResourceContent {
            body: stored.body.clone(),
            data_rows: stored.data_rows.clone(),
        })
    }

    async fn update_row(
        &self,
        schema: &'static ResourceSchema,
        id: LocalId,
        changes: &RowChanges,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        match state.tables.get_mut(schema.table) {
            Some(table) => table.update(id, changes),
            None => Ok(0),
        }
    }

    async fn apply_batch(
        &self,
        schema: &'static ResourceSchema,
        mutations: &[Mutation],
    ) -> Result<Vec<MutationOutcome>, StoreError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let fail_at = state.fail_batch_at.take();
        let reject = std::mem::take(&mut state.reject_batch);

        let mut table = state.tables.get(schema.table).cloned().unwrap_or_default();
        let mut outcomes = Vec::with_capacity(mutations.len());
        for (index, mutation) in mutations.iter().enumerate() {
            if fail_at == Some(index) {
                let reason = format!("injected failure at mutation {index}");
                return Err(if reject {
                    StoreError::ConstraintViolation(reason)
                } else {
                    StoreError::Unavailable(reason)
                });
            }
            let outcome = table.apply(&state.collections, mutation, &outcomes)?;
            outcomes.push(outcome);
        }

        state.tables.insert(schema.table, table);
        Ok(outcomes)
    }

    async fn delete_except_remote_names(
        &self,
        schema: &'static ResourceSchema,
        collection: CollectionId,
        keep: &[String],
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let Some(table) = state.tables.get_mut(schema.table) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|_, r| {
            r.row.collection != collection
                || r.row
                    .remote_name
                    .as_ref()
                    .is_none_or(|name| keep.contains(name))
        });
        Ok(before - table.rows.len())
    }

    async fn upsert_collection(&self, new: &NewCollection) -> Result<Collection, StoreError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        if let Some(existing) = state
            .collections
            .values_mut()
            .find(|c| c.account == new.account && c.url == new.url)
        {
            existing.authority = new.authority;
            existing.kind = new.kind;
            existing.sync_enabled = new.sync_enabled;
            return Ok(existing.clone());
        }

        state.next_collection_id += 1;
        let collection = Collection {
            id: CollectionId(state.next_collection_id),
            account: new.account.clone(),
            authority: new.authority,
            kind: new.kind,
            url: new.url.clone(),
            ctag: None,
            sync_enabled: new.sync_enabled,
            display_name: None,
            color: None,
        };
        state.collections.insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn collection(&self, id: CollectionId) -> Result<Collection, StoreError> {
        let state = self.state.lock().await;
        state.check_available()?;
        state.collections.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn collections(
        &self,
        account: &Account,
        authority: Authority,
    ) -> Result<Vec<Collection>, StoreError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .collections
            .values()
            .filter(|c| &c.account == account && c.authority == authority)
            .cloned()
            .collect())
    }

    async fn remove_collection(&self, id: CollectionId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        if state.collections.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        for table in state.tables.values_mut() {
            table.rows.retain(|_, r| r.row.collection != id);
        }
        Ok(())
    }

    async fn set_ctag(
        &self,
        id: CollectionId,
        ctag: Option<&CollectionTag>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.collection_mut(id)?.ctag = ctag.cloned();
        Ok(())
    }

    async fn update_metadata(
        &self,
        id: CollectionId,
        display_name: Option<&str>,
        color: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let collection = state.collection_mut(id)?;
        collection.display_name = display_name.map(str::to_string);
        collection.color = color.map(str::to_string);
        Ok(())
    }
}
