// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Column mappings of the local resource tables.
//!
//! The reconciliation logic never names a column directly; it goes through a
//! [`ResourceSchema`], so events, contacts and tasks share one implementation
//! while their tables keep their own layout.

/// Names of the table and columns that hold one kind of resource.
///
/// All names are compile-time constants and are interpolated into SQL.
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceSchema {
    /// Main table, one row per resource.
    pub table: &'static str,
    /// Primary key column of the main table.
    pub id: &'static str,
    /// Column referencing the owning collection.
    pub parent: &'static str,
    /// Column holding the remote file name.
    pub remote_name: &'static str,
    /// Column holding the last known entity tag.
    pub etag: &'static str,
    /// Column holding the globally unique identifier.
    pub uid: &'static str,
    /// Column flagging local modifications.
    pub dirty: &'static str,
    /// Column flagging local deletion.
    pub deleted: &'static str,
    /// Column holding the serialized resource body.
    pub body: &'static str,

    /// Child table holding the ordered data rows of a resource.
    pub data_table: &'static str,
    /// Column of the child table referencing the main row.
    pub data_owner: &'static str,

    /// File extension appended to generated remote names.
    pub extension: &'static str,
}

/// Calendar events.
pub const EVENTS: ResourceSchema = ResourceSchema {
    table: "events",
    id: "id",
    parent: "calendar_id",
    remote_name: "file_name",
    etag: "etag",
    uid: "uid",
    dirty: "dirty",
    deleted: "deleted",
    body: "ical",
    data_table: "event_data",
    data_owner: "event_id",
    extension: "ics",
};

/// Address book contacts.
pub const CONTACTS: ResourceSchema = ResourceSchema {
    table: "contacts",
    id: "id",
    parent: "address_book_id",
    remote_name: "source_id",
    etag: "version_tag",
    uid: "uid",
    dirty: "dirty",
    deleted: "deleted",
    body: "vcard",
    data_table: "contact_data",
    data_owner: "contact_id",
    extension: "vcf",
};

/// Task list entries.
pub const TASKS: ResourceSchema = ResourceSchema {
    table: "tasks",
    id: "id",
    parent: "list_id",
    remote_name: "file_name",
    etag: "etag",
    uid: "uid",
    dirty: "dirty",
    deleted: "deleted",
    body: "ical",
    data_table: "task_data",
    data_owner: "task_id",
    extension: "ics",
};

impl ResourceSchema {
    /// Select list yielding the fields of a [`ResourceRow`](crate::ResourceRow)
    /// under their generic names.
    pub(crate) fn row_columns(&self) -> String {
        format!(
            "{} AS id, {} AS parent, {} AS remote_name, {} AS etag, {} AS uid, {} AS dirty, {} AS deleted",
            self.id, self.parent, self.remote_name, self.etag, self.uid, self.dirty, self.deleted
        )
    }
}
