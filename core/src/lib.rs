// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Synchronization core of davsync.
//!
//! Reconciles local collections of calendar events, contacts and tasks with
//! their counterparts on a `CalDAV`/`CardDAV` server, and schedules the sync
//! passes that do so.

mod batch;
mod collection;
mod config;
mod dav;
mod detector;
mod error;
mod localdb;
mod record;
mod remote;
mod schema;
mod store;
mod token;
mod types;
mod worker;

pub mod scheduler;

#[cfg(test)]
mod tests_utils;

pub use crate::batch::{Batch, CommitError, Mutation, MutationOutcome, RowRef};
pub use crate::collection::{
    LocalCollection, NewResource, PassOptions, ResourceFailure, SyncPhase, SyncReport,
};
pub use crate::config::{APP_NAME, AccountConfig, CONFIG_ENV, CollectionConfig, Config, SchedulerConfig};
pub use crate::dav::{DavRemote, DavRemotes};
pub use crate::detector::{ChangeDetector, LocalChanges, RowPredicate};
pub use crate::error::{ConfigError, RemoteError, SchedulerError, StoreError, SyncError};
pub use crate::localdb::LocalDb;
pub use crate::record::{
    Collection, CollectionId, DataRow, LocalId, LocalResource, NewCollection, NewRow,
    ResourceContent, ResourceRow, RowChanges,
};
pub use crate::remote::{Remote, RemoteChanges, RemoteEntry, RemoteFactory, RemoteResource};
pub use crate::scheduler::{SyncRequest, SyncScheduler};
pub use crate::schema::{CONTACTS, EVENTS, ResourceSchema, TASKS};
pub use crate::store::{Filter, LocalStore, MemoryStore, Presence};
pub use crate::token::{CollectionTag, EntityTag};
pub use crate::types::{Account, Authority, ResourceKind, Resync};
pub use crate::worker::{SyncWorker, TaskResult};
pub use davsync_webdav::DavConfig;
