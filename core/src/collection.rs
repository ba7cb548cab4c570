// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Per-collection façade running one reconciliation pass at a time.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::batch::{Batch, CommitError, Mutation, RowRef};
use crate::detector::{ChangeDetector, LocalChanges, RowPredicate};
use crate::error::{RemoteError, StoreError, SyncError};
use crate::record::{
    Collection, CollectionId, LocalId, LocalResource, NewRow, ResourceContent, ResourceRow,
    RowChanges,
};
use crate::remote::{Remote, RemoteChanges, RemoteEntry, RemoteResource};
use crate::schema::ResourceSchema;
use crate::store::{Filter, LocalStore};
use crate::token::{CollectionTag, EntityTag};
use crate::types::Resync;

/// Phase of the pass a [`LocalCollection`] is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    #[default]
    Idle,
    Detecting,
    Pushing,
    Deleting,
    Pulling,
    Committing,
    Done,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Detecting => "detecting",
            SyncPhase::Pushing => "pushing",
            SyncPhase::Deleting => "deleting",
            SyncPhase::Pulling => "pulling",
            SyncPhase::Committing => "committing",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Options of a single pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOptions {
    pub resync: Resync,
    /// Push local changes only, without pulling.
    pub upload_only: bool,
}

/// A resource the pass could not reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFailure {
    /// Remote name of the resource, or the collection location for
    /// collection-wide failures.
    pub name: String,
    pub phase: SyncPhase,
    pub error: RemoteError,
}

/// Summary of a finished pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Local changes uploaded.
    pub pushed: usize,
    /// Local deletions applied.
    pub deleted: usize,
    /// Remote resources inserted locally.
    pub pulled_new: usize,
    /// Local resources replaced by their remote version.
    pub pulled_updated: usize,
    /// Local resources removed because the server no longer lists them.
    pub removed: usize,
    /// Rows removed by the prune step of a full resync.
    pub pruned: usize,
    /// Rows affected by the commit.
    pub committed: usize,
    /// Pulling was skipped because the collection tag was unchanged.
    pub pull_skipped: bool,
    /// The stored collection tag was replaced.
    pub ctag_updated: bool,
    pub failures: Vec<ResourceFailure>,
}

impl SyncReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A resource to be added by [`LocalCollection::add`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewResource {
    pub remote_name: Option<String>,
    pub etag: Option<EntityTag>,
    pub uid: Option<String>,
    pub dirty: bool,
    pub content: ResourceContent,
}

/// Names touched by the push and delete phases of the current pass.
#[derive(Debug, Default)]
struct Pushed {
    /// Uploaded resources and the entity tag the server returned.
    uploaded: HashMap<String, Option<EntityTag>>,
    /// Resources whose local change could not be pushed.
    unsynced: HashSet<String>,
    /// Resources removed locally in this pass.
    removed: HashSet<String>,
}

impl Pushed {
    fn touched(&self, name: &str) -> bool {
        self.unsynced.contains(name) || self.removed.contains(name)
    }
}

#[derive(Debug)]
struct Pulled {
    ctag: Option<CollectionTag>,
    display_name: Option<String>,
    listed: Vec<String>,
    /// Named rows outside the caller's filter; the pass leaves them alone.
    hidden: Vec<String>,
    /// Every entry the pull wanted was materialized.
    complete: bool,
}

/// A local collection bound to one remote collection.
///
/// Combines change detection, the batch of a pass and the remote
/// collaborator. Local state is only mutated by committing the batch, apart
/// from the identity assignment done by [`ChangeDetector::find_new`].
pub struct LocalCollection {
    store: Arc<dyn LocalStore>,
    info: Collection,
    predicate: Option<RowPredicate>,
    phase: SyncPhase,
}

impl fmt::Debug for LocalCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCollection")
            .field("info", &self.info)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl LocalCollection {
    pub fn new(store: Arc<dyn LocalStore>, info: Collection) -> Self {
        Self {
            store,
            info,
            predicate: None,
            phase: SyncPhase::Idle,
        }
    }

    /// Loads the collection with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such collection exists.
    pub async fn open(store: Arc<dyn LocalStore>, id: CollectionId) -> Result<Self, StoreError> {
        let info = store.collection(id).await?;
        Ok(Self::new(store, info))
    }

    /// Restricts every query of this collection to rows matching `predicate`.
    #[must_use]
    pub fn with_filter(mut self, predicate: RowPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn id(&self) -> CollectionId {
        self.info.id
    }

    #[must_use]
    pub fn info(&self) -> &Collection {
        &self.info
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    fn schema(&self) -> &'static ResourceSchema {
        self.info.kind.schema()
    }

    #[must_use]
    pub fn detector(&self) -> ChangeDetector {
        ChangeDetector::new(self.store.clone(), self.schema(), self.info.id)
            .with_predicate(self.predicate.clone())
    }

    /// See [`ChangeDetector::find_new`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn find_new(&self) -> Result<Vec<ResourceRow>, StoreError> {
        self.detector().find_new().await
    }

    /// See [`ChangeDetector::find_updated`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn find_updated(&self) -> Result<Vec<ResourceRow>, StoreError> {
        self.detector().find_updated().await
    }

    /// See [`ChangeDetector::find_deleted`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn find_deleted(&self) -> Result<Vec<ResourceRow>, StoreError> {
        self.detector().find_deleted().await
    }

    /// Looks up a resource of this collection by local id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn find_by_id(&self, id: LocalId, populate: bool) -> Result<LocalResource, StoreError> {
        self.find_one(Filter::collection(self.info.id).id(id), populate)
            .await
    }

    /// Looks up a resource of this collection by remote name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if it does not exist.
    pub async fn find_by_remote_name(
        &self,
        name: &str,
        populate: bool,
    ) -> Result<LocalResource, StoreError> {
        self.find_one(Filter::collection(self.info.id).remote_name(name), populate)
            .await
    }

    async fn find_one(&self, filter: Filter, populate: bool) -> Result<LocalResource, StoreError> {
        let row = self
            .store
            .query(self.schema(), &filter)
            .await?
            .into_iter()
            .find(|r| self.predicate.as_ref().is_none_or(|p| p(r)))
            .ok_or(StoreError::NotFound)?;

        let content = if populate {
            Some(self.store.load_content(self.schema(), row.id).await?)
        } else {
            None
        };
        Ok(LocalResource { row, content })
    }

    /// Starts an empty batch for this collection's table.
    #[must_use]
    pub fn begin(&self) -> Batch {
        Batch::new(self.schema())
    }

    /// Enqueues the insertion of a resource together with its data rows.
    pub fn add(&self, batch: &mut Batch, resource: NewResource) -> RowRef {
        let owner = batch.insert(NewRow {
            collection: self.info.id,
            remote_name: resource.remote_name,
            etag: resource.etag,
            uid: resource.uid,
            dirty: resource.dirty,
            body: resource.content.body,
        });
        for row in resource.content.data_rows {
            batch.enqueue(Mutation::InsertData { owner, row });
        }
        owner
    }

    /// Enqueues replacing the resource named `name` with a server version.
    ///
    /// The row keeps its id; its data rows are dropped and re-added.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no resource has that name.
    pub async fn update_by_remote_name(
        &self,
        batch: &mut Batch,
        name: &str,
        etag: Option<EntityTag>,
        content: ResourceContent,
    ) -> Result<LocalId, StoreError> {
        let id = self.find_by_remote_name(name, false).await?.row.id;
        self.enqueue_replace(batch, id, etag, None, content);
        Ok(id)
    }

    fn enqueue_replace(
        &self,
        batch: &mut Batch,
        id: LocalId,
        etag: Option<EntityTag>,
        uid: Option<String>,
        content: ResourceContent,
    ) {
        batch.enqueue(Mutation::Update {
            id,
            changes: RowChanges {
                etag: Some(etag),
                uid,
                dirty: Some(false),
                body: Some(content.body),
                ..Default::default()
            },
        });
        batch.enqueue(Mutation::DeleteData { owner: id });
        for row in content.data_rows {
            batch.enqueue(Mutation::InsertData {
                owner: RowRef::Id(id),
                row,
            });
        }
    }

    /// Enqueues the removal of a resource.
    pub fn delete(&self, batch: &mut Batch, id: LocalId) {
        batch.enqueue(Mutation::Delete { id });
    }

    /// Enqueues clearing the dirty flag of a resource.
    pub fn clear_dirty(&self, batch: &mut Batch, id: LocalId) {
        batch.enqueue(Mutation::Update {
            id,
            changes: RowChanges {
                dirty: Some(false),
                ..Default::default()
            },
        });
    }

    /// Enqueues recording a new entity tag for a resource.
    pub fn update_etag(&self, batch: &mut Batch, id: LocalId, etag: Option<EntityTag>) {
        batch.enqueue(Mutation::Update {
            id,
            changes: RowChanges {
                etag: Some(etag),
                ..Default::default()
            },
        });
    }

    /// Commits a batch of this collection.
    ///
    /// # Errors
    ///
    /// Returns the unapplied batch if the store rejects it.
    pub async fn commit(&self, batch: Batch) -> Result<usize, CommitError> {
        batch.commit(self.store.as_ref()).await
    }

    /// Deletes every resource of the collection whose remote name is not in
    /// `keep`, atomically. An empty `keep` deletes every named resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; nothing is deleted in that case.
    #[tracing::instrument(skip(self, keep), fields(collection = %self.info.id, keep = keep.len()))]
    pub async fn delete_all_except_remote_names(&self, keep: &[String]) -> Result<usize, StoreError> {
        let deleted = self
            .store
            .delete_except_remote_names(self.schema(), self.info.id, keep)
            .await?;
        tracing::debug!(deleted, "pruned resources");
        Ok(deleted)
    }

    /// Collection tag currently stored for this collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn ctag(&self) -> Result<Option<CollectionTag>, StoreError> {
        Ok(self.store.collection(self.info.id).await?.ctag)
    }

    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn set_ctag(&mut self, ctag: Option<CollectionTag>) -> Result<(), StoreError> {
        self.store.set_ctag(self.info.id, ctag.as_ref()).await?;
        self.info.ctag = ctag;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn update_metadata(
        &mut self,
        display_name: Option<String>,
        color: Option<String>,
    ) -> Result<(), StoreError> {
        self.store
            .update_metadata(self.info.id, display_name.as_deref(), color.as_deref())
            .await?;
        self.info.display_name = display_name;
        self.info.color = color;
        Ok(())
    }

    /// Runs one reconciliation pass against `remote`.
    ///
    /// Per-resource remote failures are collected in the report and do not
    /// stop the pass. Successful changes are committed in one batch, after
    /// which the collection tag observed while pulling is stored.
    ///
    /// Dropping the returned future before it completes discards the pending
    /// batch without touching the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; nothing of the pass is committed
    /// and the stored collection tag is left unchanged.
    #[tracing::instrument(skip_all, fields(collection = %self.info.id, url = %self.info.url))]
    pub async fn synchronize(
        &mut self,
        remote: &dyn Remote,
        options: PassOptions,
    ) -> Result<SyncReport, SyncError> {
        let result = self.run_pass(remote, options).await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    pushed = report.pushed,
                    deleted = report.deleted,
                    pulled_new = report.pulled_new,
                    pulled_updated = report.pulled_updated,
                    removed = report.removed,
                    failures = report.failures.len(),
                    "sync pass finished"
                );
                self.phase = SyncPhase::Done;
            }
            Err(err) => {
                tracing::warn!(phase = %self.phase, error = %err, "sync pass failed");
                self.phase = SyncPhase::Failed;
            }
        }
        result
    }

    fn enter(&mut self, phase: SyncPhase) {
        tracing::trace!(%phase, "entering phase");
        self.phase = phase;
    }

    async fn run_pass(
        &mut self,
        remote: &dyn Remote,
        options: PassOptions,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let mut batch = self.begin();

        self.enter(SyncPhase::Detecting);
        let changes = self.detector().detect().await?;

        self.enter(SyncPhase::Pushing);
        let mut pushed = Pushed::default();
        self.push(remote, &changes, &mut batch, &mut report, &mut pushed)
            .await?;

        self.enter(SyncPhase::Deleting);
        self.delete_remote(remote, &changes.deleted, &mut batch, &mut report, &mut pushed)
            .await;

        let pulled = if options.upload_only {
            tracing::debug!("upload only, not pulling");
            None
        } else {
            self.enter(SyncPhase::Pulling);
            self.pull(remote, options.resync, &pushed, &mut batch, &mut report)
                .await?
        };

        self.enter(SyncPhase::Committing);
        report.committed = self.commit(batch).await.map_err(|e| e.source)?;

        if let Some(pulled) = pulled {
            self.finish_pull(pulled, options.resync, &pushed, &mut report)
                .await?;
        }
        Ok(report)
    }

    async fn push(
        &self,
        remote: &dyn Remote,
        changes: &LocalChanges,
        batch: &mut Batch,
        report: &mut SyncReport,
        pushed: &mut Pushed,
    ) -> Result<(), StoreError> {
        for row in changes.new.iter().chain(&changes.updated) {
            let Some(name) = row.remote_name.clone() else {
                report.failures.push(ResourceFailure {
                    name: format!("#{}", row.id),
                    phase: SyncPhase::Pushing,
                    error: RemoteError::Failure("resource has no remote name".to_string()),
                });
                continue;
            };

            let content = self.store.load_content(self.schema(), row.id).await?;
            match remote.upload(&self.info, row, &content).await {
                Ok(etag) => {
                    tracing::debug!(%name, etag = ?etag, "uploaded resource");
                    self.update_etag(batch, row.id, etag.clone());
                    self.clear_dirty(batch, row.id);
                    pushed.uploaded.insert(name, etag);
                    report.pushed += 1;
                }
                Err(error) => {
                    tracing::warn!(%name, %error, "failed to upload resource");
                    pushed.unsynced.insert(name.clone());
                    report.failures.push(ResourceFailure {
                        name,
                        phase: SyncPhase::Pushing,
                        error,
                    });
                }
            }
        }
        Ok(())
    }

    async fn delete_remote(
        &self,
        remote: &dyn Remote,
        deleted: &[ResourceRow],
        batch: &mut Batch,
        report: &mut SyncReport,
        pushed: &mut Pushed,
    ) {
        for row in deleted {
            // never uploaded, nothing to remove remotely
            if row.etag.is_some() && row.remote_name.is_some() {
                if let Err(error) = remote.delete(&self.info, row).await {
                    let name = row.remote_name.clone().unwrap_or_default();
                    tracing::warn!(%name, %error, "failed to delete resource");
                    pushed.unsynced.insert(name.clone());
                    report.failures.push(ResourceFailure {
                        name,
                        phase: SyncPhase::Deleting,
                        error,
                    });
                    continue;
                }
            }

            self.delete(batch, row.id);
            if let Some(name) = &row.remote_name {
                pushed.removed.insert(name.clone());
            }
            report.deleted += 1;
        }
    }

    async fn pull(
        &self,
        remote: &dyn Remote,
        resync: Resync,
        pushed: &Pushed,
        batch: &mut Batch,
        report: &mut SyncReport,
    ) -> Result<Option<Pulled>, StoreError> {
        let known = match resync {
            Resync::None => self.info.ctag.as_ref(),
            Resync::ListOnly | Resync::Full => None,
        };

        let (ctag, display_name, entries) = match remote.fetch_changes(&self.info, known).await {
            Ok(RemoteChanges::Unchanged) => {
                tracing::debug!("collection tag unchanged, skipping pull");
                report.pull_skipped = true;
                return Ok(None);
            }
            Ok(RemoteChanges::Changed {
                ctag,
                display_name,
                entries,
            }) => (ctag, display_name, entries),
            Err(error) => {
                tracing::warn!(%error, "failed to list collection");
                report.failures.push(ResourceFailure {
                    name: self.info.url.clone(),
                    phase: SyncPhase::Pulling,
                    error,
                });
                return Ok(None);
            }
        };

        // names of rows outside the caller's filter must still be known, or
        // their listed entries would be inserted a second time
        let local = self
            .store
            .query(self.schema(), &Filter::collection(self.id()))
            .await?;
        let hidden: HashSet<&str> = match &self.predicate {
            Some(predicate) => local
                .iter()
                .filter(|r| !predicate(r))
                .filter_map(|r| r.remote_name.as_deref())
                .collect(),
            None => HashSet::new(),
        };
        let by_name: HashMap<&str, &ResourceRow> = local
            .iter()
            .filter_map(|r| r.remote_name.as_deref().map(|name| (name, r)))
            .collect();
        let listed: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();

        let (deferred, wanted): (Vec<String>, Vec<String>) =
            Self::stale_entries(&entries, &by_name, pushed, resync)
                .into_iter()
                .partition(|name| hidden.contains(name.as_str()));
        if !deferred.is_empty() {
            tracing::debug!(count = deferred.len(), "leaving filtered resources for a later pass");
        }

        for row in &local {
            let Some(name) = row.remote_name.as_deref() else {
                continue;
            };
            let vanished = !listed.contains(name)
                && !hidden.contains(name)
                && row.etag.is_some()
                && !row.dirty
                && !row.deleted
                && !pushed.uploaded.contains_key(name)
                && !pushed.touched(name);
            if vanished {
                tracing::debug!(name, "resource removed on server");
                self.delete(batch, row.id);
                report.removed += 1;
            }
        }

        let materialized = self
            .materialize(remote, &wanted, &by_name, batch, report)
            .await;
        let hidden = hidden.into_iter().map(str::to_string).collect();

        Ok(Some(Pulled {
            ctag,
            display_name,
            listed: entries.into_iter().map(|e| e.name).collect(),
            hidden,
            complete: materialized && deferred.is_empty(),
        }))
    }

    /// Names of listed entries that are missing or outdated locally.
    fn stale_entries(
        entries: &[RemoteEntry],
        local: &HashMap<&str, &ResourceRow>,
        pushed: &Pushed,
        resync: Resync,
    ) -> Vec<String> {
        entries
            .iter()
            .filter(|entry| !pushed.touched(&entry.name))
            .filter(|entry| match local.get(entry.name.as_str()) {
                None => true,
                Some(row) => {
                    let just_uploaded = pushed.uploaded.get(&entry.name);
                    let known = match just_uploaded {
                        Some(etag) => etag.as_ref(),
                        None => row.etag.as_ref(),
                    };
                    (resync == Resync::Full && just_uploaded.is_none())
                        || entry.etag.is_none()
                        || entry.etag.as_ref() != known
                }
            })
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Downloads `wanted` and enqueues their local inserts or updates.
    ///
    /// Returns whether every wanted entry was delivered.
    async fn materialize(
        &self,
        remote: &dyn Remote,
        wanted: &[String],
        local: &HashMap<&str, &ResourceRow>,
        batch: &mut Batch,
        report: &mut SyncReport,
    ) -> bool {
        if wanted.is_empty() {
            return true;
        }

        let resources = match remote.download(&self.info, wanted).await {
            Ok(resources) => resources,
            Err(error) => {
                tracing::warn!(%error, count = wanted.len(), "failed to download resources");
                report.failures.push(ResourceFailure {
                    name: self.info.url.clone(),
                    phase: SyncPhase::Pulling,
                    error,
                });
                return false;
            }
        };

        let mut missing: HashSet<&str> = wanted.iter().map(String::as_str).collect();
        for resource in resources {
            if !missing.remove(resource.name.as_str()) {
                tracing::warn!(name = %resource.name, "ignoring resource that was not requested");
                continue;
            }
            self.enqueue_download(batch, local.get(resource.name.as_str()).copied(), resource, report);
        }

        for name in &missing {
            tracing::warn!(name, "server did not deliver resource");
            report.failures.push(ResourceFailure {
                name: (*name).to_string(),
                phase: SyncPhase::Pulling,
                error: RemoteError::Failure("resource was not delivered".to_string()),
            });
        }
        missing.is_empty()
    }

    fn enqueue_download(
        &self,
        batch: &mut Batch,
        existing: Option<&ResourceRow>,
        resource: RemoteResource,
        report: &mut SyncReport,
    ) {
        match existing {
            Some(row) => {
                tracing::debug!(name = %resource.name, "updating resource from server");
                self.enqueue_replace(batch, row.id, resource.etag, resource.uid, resource.content);
                report.pulled_updated += 1;
            }
            None => {
                tracing::debug!(name = %resource.name, "adding resource from server");
                self.add(
                    batch,
                    NewResource {
                        remote_name: Some(resource.name),
                        etag: resource.etag,
                        uid: resource.uid,
                        dirty: false,
                        content: resource.content,
                    },
                );
                report.pulled_new += 1;
            }
        }
    }

    async fn finish_pull(
        &mut self,
        pulled: Pulled,
        resync: Resync,
        pushed: &Pushed,
        report: &mut SyncReport,
    ) -> Result<(), StoreError> {
        if pulled.display_name.is_some() && pulled.display_name != self.info.display_name {
            let color = self.info.color.clone();
            self.update_metadata(pulled.display_name, color).await?;
        }

        // an incomplete pull must be repeated even if the server stays unchanged
        if !pulled.complete {
            return Ok(());
        }

        if resync == Resync::Full {
            let mut keep = pulled.listed;
            keep.extend(pulled.hidden);
            keep.extend(pushed.unsynced.iter().cloned());
            keep.extend(pushed.uploaded.keys().cloned());
            report.pruned = self.delete_all_except_remote_names(&keep).await?;
        }

        if pulled.ctag != self.info.ctag {
            self.set_ctag(pulled.ctag).await?;
            report.ctag_updated = true;
        }
        Ok(())
    }
}
