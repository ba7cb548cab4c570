// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use sqlx::SqlitePool;

use crate::error::StoreError;
use crate::record::{Collection, CollectionId, NewCollection};
use crate::token::CollectionTag;
use crate::types::{Account, Authority};

const COLUMNS: &str = "\
id, account_name, account_kind, authority, kind, url, ctag, sync_enabled, display_name, color";

#[derive(Debug, Clone)]
pub struct Collections {
    pool: SqlitePool,
}

impl Collections {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, new: &NewCollection) -> Result<Collection, StoreError> {
        let sql = format!(
            "\
INSERT INTO collections (account_name, account_kind, authority, kind, url, sync_enabled)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(account_name, account_kind, url) DO UPDATE SET
    authority    = excluded.authority,
    kind         = excluded.kind,
    sync_enabled = excluded.sync_enabled
RETURNING {COLUMNS};
"
        );

        let record: CollectionRecord = sqlx::query_as(&sql)
            .bind(&new.account.name)
            .bind(&new.account.kind)
            .bind(new.authority.as_str())
            .bind(new.kind.as_str())
            .bind(&new.url)
            .bind(new.sync_enabled)
            .fetch_one(&self.pool)
            .await?;
        record.try_into()
    }

    pub async fn get(&self, id: CollectionId) -> Result<Collection, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM collections WHERE id = ?;");
        let record: Option<CollectionRecord> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        record.ok_or(StoreError::NotFound)?.try_into()
    }

    pub async fn list(
        &self,
        account: &Account,
        authority: Authority,
    ) -> Result<Vec<Collection>, StoreError> {
        let sql = format!(
            "\
SELECT {COLUMNS}
FROM collections
WHERE account_name = ? AND account_kind = ? AND authority = ?
ORDER BY id;
"
        );
        let records: Vec<CollectionRecord> = sqlx::query_as(&sql)
            .bind(&account.name)
            .bind(&account.kind)
            .bind(authority.as_str())
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn remove(&self, id: CollectionId) -> Result<(), StoreError> {
        const SQL: &str = "DELETE FROM collections WHERE id = ?;";

        let result = sqlx::query(SQL).bind(id.0).execute(&self.pool).await?;
        found(result.rows_affected())
    }

    pub async fn set_ctag(
        &self,
        id: CollectionId,
        ctag: Option<&CollectionTag>,
    ) -> Result<(), StoreError> {
        const SQL: &str = "UPDATE collections SET ctag = ? WHERE id = ?;";

        let result = sqlx::query(SQL)
            .bind(ctag.map(CollectionTag::as_str))
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        found(result.rows_affected())
    }

    pub async fn update_metadata(
        &self,
        id: CollectionId,
        display_name: Option<&str>,
        color: Option<&str>,
    ) -> Result<(), StoreError> {
        const SQL: &str = "UPDATE collections SET display_name = ?, color = ? WHERE id = ?;";

        let result = sqlx::query(SQL)
            .bind(display_name)
            .bind(color)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        found(result.rows_affected())
    }
}

fn found(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CollectionRecord {
    id: i64,
    account_name: String,
    account_kind: String,
    authority: String,
    kind: String,
    url: String,
    ctag: Option<String>,
    sync_enabled: bool,
    display_name: Option<String>,
    color: Option<String>,
}

impl TryFrom<CollectionRecord> for Collection {
    type Error = StoreError;

    fn try_from(record: CollectionRecord) -> Result<Self, Self::Error> {
        Ok(Collection {
            id: CollectionId(record.id),
            account: Account {
                name: record.account_name,
                kind: record.account_kind,
            },
            authority: record.authority.parse().map_err(StoreError::ConstraintViolation)?,
            kind: record.kind.parse().map_err(StoreError::ConstraintViolation)?,
            url: record.url,
            ctag: record.ctag.map(CollectionTag::from),
            sync_enabled: record.sync_enabled,
            display_name: record.display_name,
            color: record.color,
        })
    }
}
