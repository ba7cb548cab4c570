// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::batch::{Mutation, MutationOutcome, resolve_owner};
use crate::error::StoreError;
use crate::record::{CollectionId, DataRow, LocalId, NewRow, ResourceContent, ResourceRow, RowChanges};
use crate::schema::ResourceSchema;
use crate::store::{Filter, Presence};
use crate::token::EntityTag;

/// Resource tables described by a [`ResourceSchema`].
#[derive(Debug, Clone)]
pub struct Resources {
    pool: SqlitePool,
}

impl Resources {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn query(
        &self,
        schema: &ResourceSchema,
        filter: &Filter,
    ) -> Result<Vec<ResourceRow>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {};",
            schema.row_columns(),
            schema.table,
            Self::build_where(schema, filter),
            schema.id,
        );

        let query = Self::bind_filter(filter, sqlx::query_as(&sql));
        let records: Vec<ResourceRecord> = query.fetch_all(&self.pool).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    pub async fn load_content(
        &self,
        schema: &ResourceSchema,
        id: LocalId,
    ) -> Result<Option<ResourceContent>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?;",
            schema.body, schema.table, schema.id
        );
        let body: Option<String> = sqlx::query_scalar(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        let Some(body) = body else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT name, value FROM {} WHERE {} = ? ORDER BY id;",
            schema.data_table, schema.data_owner
        );
        let data_rows: Vec<(String, String)> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(ResourceContent {
            body,
            data_rows: data_rows
                .into_iter()
                .map(|(key, value)| DataRow { key, value })
                .collect(),
        }))
    }

    pub async fn update_row(
        &self,
        schema: &ResourceSchema,
        id: LocalId,
        changes: &RowChanges,
    ) -> Result<usize, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::update(&mut *conn, schema, id, changes).await
    }

    /// Applies `mutations` in one transaction, rolling back on the first error.
    #[tracing::instrument(skip_all, fields(table = schema.table, count = mutations.len()))]
    pub async fn apply_batch(
        &self,
        schema: &ResourceSchema,
        mutations: &[Mutation],
    ) -> Result<Vec<MutationOutcome>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut outcomes = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            let outcome = match mutation {
                Mutation::Insert(new) => {
                    MutationOutcome::Inserted(Self::insert(&mut *tx, schema, new).await?)
                }
                Mutation::Update { id, changes } => {
                    MutationOutcome::Affected(Self::update(&mut *tx, schema, *id, changes).await?)
                }
                Mutation::Delete { id } => {
                    let sql = format!("DELETE FROM {} WHERE {} = ?;", schema.table, schema.id);
                    let result = sqlx::query(&sql).bind(id.0).execute(&mut *tx).await?;
                    MutationOutcome::Affected(affected(result.rows_affected()))
                }
                Mutation::InsertData { owner, row } => {
                    let owner = resolve_owner(*owner, &outcomes)?;
                    let sql = format!(
                        "INSERT INTO {} ({}, name, value) VALUES (?, ?, ?);",
                        schema.data_table, schema.data_owner
                    );
                    sqlx::query(&sql)
                        .bind(owner.0)
                        .bind(&row.key)
                        .bind(&row.value)
                        .execute(&mut *tx)
                        .await?;
                    MutationOutcome::Affected(1)
                }
                Mutation::DeleteData { owner } => {
                    let sql = format!(
                        "DELETE FROM {} WHERE {} = ?;",
                        schema.data_table, schema.data_owner
                    );
                    let result = sqlx::query(&sql).bind(owner.0).execute(&mut *tx).await?;
                    MutationOutcome::Affected(affected(result.rows_affected()))
                }
            };
            outcomes.push(outcome);
        }
        tx.commit().await?;
        Ok(outcomes)
    }

    pub async fn delete_except_remote_names(
        &self,
        schema: &ResourceSchema,
        collection: CollectionId,
        keep: &[String],
    ) -> Result<usize, sqlx::Error> {
        let mut sql = format!(
            "DELETE FROM {} WHERE {} = ? AND {} IS NOT NULL",
            schema.table, schema.parent, schema.remote_name
        );
        if !keep.is_empty() {
            let placeholders = vec!["?"; keep.len()].join(", ");
            sql += &format!(" AND {} NOT IN ({placeholders})", schema.remote_name);
        }
        sql += ";";

        let mut query = sqlx::query(&sql).bind(collection.0);
        for name in keep {
            query = query.bind(name);
        }
        let result = query.execute(&self.pool).await?;
        Ok(affected(result.rows_affected()))
    }

    async fn insert(
        conn: &mut SqliteConnection,
        schema: &ResourceSchema,
        new: &NewRow,
    ) -> Result<LocalId, sqlx::Error> {
        let sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, 0, ?);",
            schema.table,
            schema.parent,
            schema.remote_name,
            schema.etag,
            schema.uid,
            schema.dirty,
            schema.deleted,
            schema.body,
        );
        let result = sqlx::query(&sql)
            .bind(new.collection.0)
            .bind(new.remote_name.as_deref())
            .bind(new.etag.as_ref().map(EntityTag::as_str))
            .bind(new.uid.as_deref())
            .bind(new.dirty)
            .bind(&new.body)
            .execute(&mut *conn)
            .await?;
        Ok(LocalId(result.last_insert_rowid()))
    }

    async fn update(
        conn: &mut SqliteConnection,
        schema: &ResourceSchema,
        id: LocalId,
        changes: &RowChanges,
    ) -> Result<usize, sqlx::Error> {
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?;",
            schema.table,
            Self::build_set(schema, changes),
            schema.id
        );
        let query = Self::bind_changes(changes, sqlx::query(&sql));
        let result = query.bind(id.0).execute(&mut *conn).await?;
        Ok(affected(result.rows_affected()))
    }

    fn build_where(schema: &ResourceSchema, filter: &Filter) -> String {
        let mut where_clauses = Vec::new();
        if filter.collection.is_some() {
            where_clauses.push(format!("{} = ?", schema.parent));
        }
        if filter.id.is_some() {
            where_clauses.push(format!("{} = ?", schema.id));
        }
        if filter.remote_name.is_some() {
            where_clauses.push(format!("{} = ?", schema.remote_name));
        }
        match filter.etag {
            Some(Presence::Null) => where_clauses.push(format!("{} IS NULL", schema.etag)),
            Some(Presence::NotNull) => where_clauses.push(format!("{} IS NOT NULL", schema.etag)),
            None => {}
        }
        if filter.dirty.is_some() {
            where_clauses.push(format!("{} = ?", schema.dirty));
        }
        if filter.deleted.is_some() {
            where_clauses.push(format!("{} = ?", schema.deleted));
        }

        if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        }
    }

    fn bind_filter<'a, O>(
        filter: &'a Filter,
        mut query: QueryAs<'a, Sqlite, O, SqliteArguments<'a>>,
    ) -> QueryAs<'a, Sqlite, O, SqliteArguments<'a>> {
        if let Some(collection) = filter.collection {
            query = query.bind(collection.0);
        }
        if let Some(id) = filter.id {
            query = query.bind(id.0);
        }
        if let Some(name) = &filter.remote_name {
            query = query.bind(name.as_str());
        }
        if let Some(dirty) = filter.dirty {
            query = query.bind(dirty);
        }
        if let Some(deleted) = filter.deleted {
            query = query.bind(deleted);
        }
        query
    }

    fn build_set(schema: &ResourceSchema, changes: &RowChanges) -> String {
        let mut set_clauses = Vec::new();
        if changes.remote_name.is_some() {
            set_clauses.push(format!("{} = ?", schema.remote_name));
        }
        if changes.etag.is_some() {
            set_clauses.push(format!("{} = ?", schema.etag));
        }
        if changes.uid.is_some() {
            set_clauses.push(format!("{} = ?", schema.uid));
        }
        if changes.dirty.is_some() {
            set_clauses.push(format!("{} = ?", schema.dirty));
        }
        if changes.deleted.is_some() {
            set_clauses.push(format!("{} = ?", schema.deleted));
        }
        if changes.body.is_some() {
            set_clauses.push(format!("{} = ?", schema.body));
        }

        if set_clauses.is_empty() {
            // still reports whether the row exists
            format!("{0} = {0}", schema.id)
        } else {
            set_clauses.join(", ")
        }
    }

    fn bind_changes<'a>(
        changes: &'a RowChanges,
        mut query: Query<'a, Sqlite, SqliteArguments<'a>>,
    ) -> Query<'a, Sqlite, SqliteArguments<'a>> {
        if let Some(name) = &changes.remote_name {
            query = query.bind(name.as_str());
        }
        if let Some(etag) = &changes.etag {
            query = query.bind(etag.as_ref().map(EntityTag::as_str));
        }
        if let Some(uid) = &changes.uid {
            query = query.bind(uid.as_str());
        }
        if let Some(dirty) = changes.dirty {
            query = query.bind(dirty);
        }
        if let Some(deleted) = changes.deleted {
            query = query.bind(deleted);
        }
        if let Some(body) = &changes.body {
            query = query.bind(body.as_str());
        }
        query
    }
}

fn affected(rows: u64) -> usize {
    usize::try_from(rows).unwrap_or(usize::MAX)
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ResourceRecord {
    id: i64,
    parent: i64,
    remote_name: Option<String>,
    etag: Option<String>,
    uid: Option<String>,
    dirty: bool,
    deleted: bool,
}

impl From<ResourceRecord> for ResourceRow {
    fn from(record: ResourceRecord) -> Self {
        ResourceRow {
            id: LocalId(record.id),
            collection: CollectionId(record.parent),
            remote_name: record.remote_name,
            etag: record.etag.map(EntityTag::from),
            uid: record.uid,
            dirty: record.dirty,
            deleted: record.deleted,
        }
    }
}
