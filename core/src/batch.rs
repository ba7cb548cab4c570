// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Ordered, all-or-nothing lists of pending local mutations.

use crate::error::StoreError;
use crate::record::{DataRow, LocalId, NewRow, RowChanges};
use crate::schema::ResourceSchema;
use crate::store::LocalStore;

/// Reference to the resource row a data row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRef {
    /// An existing row.
    Id(LocalId),
    /// The row produced by the insert at this index of the same batch.
    Backref(usize),
}

/// One pending change to the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert(NewRow),
    Update { id: LocalId, changes: RowChanges },
    Delete { id: LocalId },
    InsertData { owner: RowRef, row: DataRow },
    /// Removes every data row of a resource.
    DeleteData { owner: LocalId },
}

/// Result of one applied mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Inserted(LocalId),
    Affected(usize),
}

impl MutationOutcome {
    /// Number of rows this mutation touched.
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            MutationOutcome::Inserted(_) => 1,
            MutationOutcome::Affected(n) => n,
        }
    }
}

/// Resolves the owner of a data row against the outcomes applied so far.
///
/// A back-reference must point at an earlier insert of the same batch.
pub(crate) fn resolve_owner(
    owner: RowRef,
    applied: &[MutationOutcome],
) -> Result<LocalId, StoreError> {
    match owner {
        RowRef::Id(id) => Ok(id),
        RowRef::Backref(index) => match applied.get(index) {
            Some(MutationOutcome::Inserted(id)) => Ok(*id),
            _ => Err(StoreError::ConstraintViolation(format!(
                "back-reference {index} does not name an earlier insert"
            ))),
        },
    }
}

/// Commit of a [`Batch`] failed; nothing was applied.
///
/// The batch is handed back so the caller decides whether to retry it or
/// drop it.
#[derive(Debug, thiserror::Error)]
#[error("failed to commit {count} pending mutation(s): {source}", count = .batch.len())]
pub struct CommitError {
    #[source]
    pub source: StoreError,
    batch: Batch,
}

impl CommitError {
    /// Takes back the batch that failed to commit.
    #[must_use]
    pub fn into_batch(self) -> Batch {
        self.batch
    }
}

/// Ordered list of mutations applied atomically by [`Batch::commit`].
///
/// A batch lives for the duration of one pass. Dropping it discards every
/// pending mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    schema: &'static ResourceSchema,
    mutations: Vec<Mutation>,
}

impl Batch {
    #[must_use]
    pub fn new(schema: &'static ResourceSchema) -> Self {
        Self {
            schema,
            mutations: Vec::new(),
        }
    }

    /// Appends a mutation and returns its index.
    pub fn enqueue(&mut self, mutation: Mutation) -> usize {
        self.mutations.push(mutation);
        self.mutations.len() - 1
    }

    /// Appends an insert and returns a reference later mutations can use to
    /// attach data rows to the new resource.
    pub fn insert(&mut self, row: NewRow) -> RowRef {
        RowRef::Backref(self.enqueue(Mutation::Insert(row)))
    }

    #[must_use]
    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Applies every pending mutation as one atomic unit.
    ///
    /// Returns the summed number of affected rows. Committing an empty batch
    /// does not touch the store.
    ///
    /// # Errors
    ///
    /// Returns a [`CommitError`] holding the unapplied batch if the store
    /// rejects any mutation.
    #[tracing::instrument(skip_all, fields(table = self.schema.table, pending = self.mutations.len()))]
    pub async fn commit<S: LocalStore + ?Sized>(self, store: &S) -> Result<usize, CommitError> {
        if self.mutations.is_empty() {
            return Ok(0);
        }

        match store.apply_batch(self.schema, &self.mutations).await {
            Ok(outcomes) => {
                let affected = outcomes.into_iter().map(MutationOutcome::count).sum();
                tracing::debug!(affected, "batch committed");
                Ok(affected)
            }
            Err(source) => {
                tracing::warn!(error = %source, "batch rejected, nothing applied");
                Err(CommitError {
                    source,
                    batch: self,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CollectionId, NewCollection};
    use crate::schema::EVENTS;
    use crate::store::{Filter, MemoryStore};
    use crate::types::{Account, Authority, ResourceKind};

    async fn setup() -> (MemoryStore, CollectionId) {
        let store = MemoryStore::new();
        let collection = store
            .upsert_collection(&NewCollection {
                account: Account::new("alice"),
                authority: Authority::Calendar,
                kind: ResourceKind::Event,
                url: "/dav/cal/".to_string(),
                sync_enabled: true,
            })
            .await
            .unwrap();
        (store, collection.id)
    }

    fn new_row(collection: CollectionId, name: &str) -> NewRow {
        NewRow {
            collection,
            remote_name: Some(name.to_string()),
            etag: None,
            uid: None,
            dirty: false,
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn batch_commit_empty_is_noop() {
        let (store, _) = setup().await;
        store.fail_next_batch_at(0).await;

        let affected = Batch::new(&EVENTS).commit(&store).await.unwrap();

        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn batch_commit_sums_affected_rows() {
        // Arrange
        let (store, collection) = setup().await;
        let mut batch = Batch::new(&EVENTS);
        let owner = batch.insert(new_row(collection, "a.ics"));
        batch.enqueue(Mutation::InsertData {
            owner,
            row: DataRow::new("summary", "Standup"),
        });
        batch.insert(new_row(collection, "b.ics"));

        // Act
        let affected = batch.commit(&store).await.unwrap();

        // Assert
        assert_eq!(affected, 3);
        let rows = store.query(&EVENTS, &Filter::collection(collection)).await.unwrap();
        assert_eq!(rows.len(), 2);
        let content = store.load_content(&EVENTS, rows[0].id).await.unwrap();
        assert_eq!(content.data_rows, vec![DataRow::new("summary", "Standup")]);
    }

    #[tokio::test]
    async fn batch_commit_failure_applies_nothing_and_returns_batch() {
        // Arrange
        let (store, collection) = setup().await;
        let mut batch = Batch::new(&EVENTS);
        batch.insert(new_row(collection, "a.ics"));
        batch.insert(new_row(collection, "b.ics"));
        batch.insert(new_row(collection, "c.ics"));
        store.fail_next_batch_at(2).await;

        // Act
        let err = batch.commit(&store).await.unwrap_err();

        // Assert
        assert!(err.source.is_retryable());
        let rows = store.query(&EVENTS, &Filter::collection(collection)).await.unwrap();
        assert!(rows.is_empty());

        let batch = err.into_batch();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.commit(&store).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn batch_backref_must_name_an_insert() {
        let (store, collection) = setup().await;
        let mut batch = Batch::new(&EVENTS);
        batch.insert(new_row(collection, "a.ics"));
        batch.enqueue(Mutation::InsertData {
            owner: RowRef::Backref(1),
            row: DataRow::new("k", "v"),
        });

        let err = batch.commit(&store).await.unwrap_err();

        assert!(matches!(err.source, StoreError::ConstraintViolation(_)));
        let rows = store.query(&EVENTS, &Filter::default()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn resolve_owner_accepts_existing_ids() {
        let id = resolve_owner(RowRef::Id(LocalId(9)), &[]).unwrap();
        assert_eq!(id, LocalId(9));

        let applied = [MutationOutcome::Affected(1), MutationOutcome::Inserted(LocalId(4))];
        assert_eq!(resolve_owner(RowRef::Backref(1), &applied), Ok(LocalId(4)));
        assert!(resolve_owner(RowRef::Backref(0), &applied).is_err());
    }
}
