// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for the synchronization core.
//!
//! This module provides an in-memory server double and helpers to seed a
//! [`MemoryStore`] with local edits.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::batch::{Batch, Mutation};
use crate::error::RemoteError;
use crate::record::{
    Collection, LocalId, NewCollection, NewRow, ResourceContent, ResourceRow, RowChanges,
};
use crate::remote::{Remote, RemoteChanges, RemoteEntry, RemoteResource};
use crate::store::{LocalStore, MemoryStore};
use crate::token::{CollectionTag, EntityTag};
use crate::types::{Account, Authority, ResourceKind};

/// Creates a memory store holding one calendar collection of `alice`.
pub async fn setup_store() -> (Arc<MemoryStore>, Collection) {
    let store = Arc::new(MemoryStore::new());
    let collection = store
        .upsert_collection(&NewCollection {
            account: Account::new("alice"),
            authority: Authority::Calendar,
            kind: ResourceKind::Event,
            url: "/dav/cal/".to_string(),
            sync_enabled: true,
        })
        .await
        .expect("Failed to create collection");
    (store, collection)
}

/// Inserts a resource row directly, bypassing the sync logic.
pub async fn seed_row(store: &MemoryStore, collection: &Collection, row: SeedRow) -> LocalId {
    let schema = collection.kind.schema();
    let mut batch = Batch::new(schema);
    batch.insert(NewRow {
        collection: collection.id,
        remote_name: row.name.map(str::to_string),
        etag: row.etag.map(EntityTag::from),
        uid: row.uid.map(str::to_string),
        dirty: row.dirty,
        body: row.body.to_string(),
    });
    batch.commit(store).await.expect("Failed to seed row");

    let rows = store
        .query(schema, &crate::store::Filter::collection(collection.id))
        .await
        .expect("Failed to query seeded row");
    let id = rows.last().expect("Seeded row is missing").id;

    if row.deleted {
        store
            .apply_batch(
                schema,
                &[Mutation::Update {
                    id,
                    changes: RowChanges {
                        deleted: Some(true),
                        ..Default::default()
                    },
                }],
            )
            .await
            .expect("Failed to flag row as deleted");
    }
    id
}

/// Shape of a seeded row.
#[derive(Debug, Clone, Copy)]
pub struct SeedRow {
    pub name: Option<&'static str>,
    pub uid: Option<&'static str>,
    pub etag: Option<&'static str>,
    pub dirty: bool,
    pub deleted: bool,
    pub body: &'static str,
}

impl SeedRow {
    /// A row created locally and never uploaded.
    pub fn created(body: &'static str) -> Self {
        Self {
            name: None,
            uid: None,
            etag: None,
            dirty: true,
            deleted: false,
            body,
        }
    }

    /// A row in sync with the server.
    pub fn synced(name: &'static str, etag: &'static str, body: &'static str) -> Self {
        Self {
            name: Some(name),
            uid: None,
            etag: Some(etag),
            dirty: false,
            deleted: false,
            body,
        }
    }

    /// A synced row that was modified locally.
    pub fn modified(name: &'static str, etag: &'static str, body: &'static str) -> Self {
        Self {
            dirty: true,
            ..Self::synced(name, etag, body)
        }
    }

    /// A synced row that was deleted locally.
    pub fn removed(name: &'static str, etag: &'static str) -> Self {
        Self {
            deleted: true,
            ..Self::synced(name, etag, "")
        }
    }
}

/// In-memory stand-in for a remote collection.
///
/// Every write bumps the collection tag. Entity tags are issued as `"e{n}"`.
#[derive(Debug, Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    members: BTreeMap<String, (EntityTag, String)>,
    version: u64,
    display_name: Option<String>,
    fail_uploads: HashSet<String>,
    fail_deletes: HashSet<String>,
    withhold: HashSet<String>,
    fail_listing: bool,
    omit_etag: bool,
    uploads: Vec<String>,
    deletes: Vec<String>,
    downloads: Vec<String>,
    listings: usize,
}

impl FakeState {
    fn bump(&mut self) -> EntityTag {
        self.version += 1;
        EntityTag::new(format!("\"e{}\"", self.version))
    }

    fn ctag(&self) -> CollectionTag {
        CollectionTag::new(format!("ctag-{}", self.version))
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a member as if another client had written it.
    pub async fn put_member(&self, name: &str, body: &str) -> EntityTag {
        let mut state = self.state.lock().await;
        let etag = state.bump();
        state
            .members
            .insert(name.to_string(), (etag.clone(), body.to_string()));
        etag
    }

    /// Removes a member as if another client had deleted it.
    pub async fn remove_member(&self, name: &str) {
        let mut state = self.state.lock().await;
        state.members.remove(name);
        state.bump();
    }

    pub async fn member(&self, name: &str) -> Option<(EntityTag, String)> {
        self.state.lock().await.members.get(name).cloned()
    }

    pub async fn ctag(&self) -> CollectionTag {
        self.state.lock().await.ctag()
    }

    pub async fn set_display_name(&self, name: &str) {
        self.state.lock().await.display_name = Some(name.to_string());
    }

    pub async fn fail_upload(&self, name: &str) {
        self.state.lock().await.fail_uploads.insert(name.to_string());
    }

    pub async fn fail_delete(&self, name: &str) {
        self.state.lock().await.fail_deletes.insert(name.to_string());
    }

    /// Makes downloads leave out `name`.
    pub async fn withhold(&self, name: &str) {
        self.state.lock().await.withhold.insert(name.to_string());
    }

    pub async fn fail_listing(&self, fail: bool) {
        self.state.lock().await.fail_listing = fail;
    }

    /// Makes uploads succeed without reporting an entity tag.
    pub async fn omit_etag(&self, omit: bool) {
        self.state.lock().await.omit_etag = omit;
    }

    pub async fn uploads(&self) -> Vec<String> {
        self.state.lock().await.uploads.clone()
    }

    pub async fn deletes(&self) -> Vec<String> {
        self.state.lock().await.deletes.clone()
    }

    pub async fn downloads(&self) -> Vec<String> {
        self.state.lock().await.downloads.clone()
    }

    pub async fn listings(&self) -> usize {
        self.state.lock().await.listings
    }
}

fn name_of(resource: &ResourceRow) -> Result<String, RemoteError> {
    resource
        .remote_name
        .clone()
        .ok_or_else(|| RemoteError::Failure("resource has no remote name".to_string()))
}

#[async_trait]
impl Remote for FakeRemote {
    async fn upload(
        &self,
        _collection: &Collection,
        resource: &ResourceRow,
        content: &ResourceContent,
    ) -> Result<Option<EntityTag>, RemoteError> {
        let name = name_of(resource)?;
        let mut state = self.state.lock().await;
        state.uploads.push(name.clone());
        if state.fail_uploads.contains(&name) {
            return Err(RemoteError::Failure(format!("upload of {name} failed")));
        }

        let current = state.members.get(&name).map(|(etag, _)| etag.clone());
        match (&resource.etag, current) {
            (None, Some(_)) => {
                return Err(RemoteError::Conflict(format!("{name} already exists")));
            }
            (Some(expected), Some(actual)) if *expected != actual => {
                return Err(RemoteError::Conflict(format!("{name} was modified")));
            }
            (Some(_), None) => {
                return Err(RemoteError::Conflict(format!("{name} no longer exists")));
            }
            _ => {}
        }

        let etag = state.bump();
        state
            .members
            .insert(name, (etag.clone(), content.body.clone()));
        Ok((!state.omit_etag).then_some(etag))
    }

    async fn delete(
        &self,
        _collection: &Collection,
        resource: &ResourceRow,
    ) -> Result<(), RemoteError> {
        let name = name_of(resource)?;
        let mut state = self.state.lock().await;
        state.deletes.push(name.clone());
        if state.fail_deletes.contains(&name) {
            return Err(RemoteError::Failure(format!("delete of {name} failed")));
        }
        if state.members.remove(&name).is_some() {
            state.bump();
        }
        Ok(())
    }

    async fn fetch_changes(
        &self,
        _collection: &Collection,
        known: Option<&CollectionTag>,
    ) -> Result<RemoteChanges, RemoteError> {
        let mut state = self.state.lock().await;
        if state.fail_listing {
            return Err(RemoteError::Failure("listing failed".to_string()));
        }
        let ctag = state.ctag();
        if known == Some(&ctag) {
            return Ok(RemoteChanges::Unchanged);
        }

        state.listings += 1;
        let entries = state
            .members
            .iter()
            .map(|(name, (etag, _))| RemoteEntry {
                name: name.clone(),
                etag: Some(etag.clone()),
            })
            .collect();
        Ok(RemoteChanges::Changed {
            ctag: Some(ctag),
            display_name: state.display_name.clone(),
            entries,
        })
    }

    async fn download(
        &self,
        _collection: &Collection,
        names: &[String],
    ) -> Result<Vec<RemoteResource>, RemoteError> {
        let mut state = self.state.lock().await;
        state.downloads.extend(names.iter().cloned());
        Ok(names
            .iter()
            .filter(|name| !state.withhold.contains(*name))
            .filter_map(|name| {
                let (etag, body) = state.members.get(name)?;
                Some(RemoteResource {
                    name: name.clone(),
                    etag: Some(etag.clone()),
                    uid: None,
                    content: ResourceContent::new(body.clone()),
                })
            })
            .collect())
    }
}
