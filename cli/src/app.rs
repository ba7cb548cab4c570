// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::sync::Arc;

use davsync_core::scheduler::{InMemoryQueue, LogNotifier, SystemClock};
use davsync_core::{
    Account, Authority, Config, DavRemotes, LocalDb, LocalStore, SyncScheduler, SyncWorker,
};

/// Everything a command needs: the local database, the task queue and the
/// worker draining it.
#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub db: Arc<LocalDb>,
    pub queue: Arc<InMemoryQueue>,
    pub scheduler: SyncScheduler,
    pub worker: SyncWorker,
}

impl App {
    /// Opens the database and registers the collections of every account.
    pub async fn new(config: Config) -> Result<Self, Box<dyn Error>> {
        let path = config
            .database_path()
            .ok_or("No state directory configured, set `state_dir` in the config file")?;
        let db = Arc::new(LocalDb::open(Some(&path)).await?);

        for account in &config.accounts {
            for collection in account.new_collections() {
                tracing::debug!(account = %collection.account, url = %collection.url, "registering collection");
                db.upsert_collection(&collection).await?;
            }
        }

        let remotes = DavRemotes::new(
            config
                .accounts
                .iter()
                .map(|a| (a.account(), a.server.clone())),
        )?;

        let queue = Arc::new(InMemoryQueue::new(
            Arc::new(SystemClock),
            config.scheduler.backoff(),
        ));
        let scheduler = SyncScheduler::new(queue.clone(), Arc::new(LogNotifier))
            .with_tasks_available(config.scheduler.tasks_available);
        let worker = SyncWorker::new(db.clone(), Arc::new(remotes));

        Ok(Self {
            config,
            db,
            queue,
            scheduler,
            worker,
        })
    }

    /// Configured accounts, or only `name` if given.
    pub fn accounts(&self, name: Option<&str>) -> Result<Vec<Account>, Box<dyn Error>> {
        match name {
            Some(name) => match self.config.account(name) {
                Some(account) => Ok(vec![account.account()]),
                None => Err(format!("Account {name} is not configured").into()),
            },
            None => Ok(self.config.accounts.iter().map(|a| a.account()).collect()),
        }
    }

    /// Authorities to sync, or only `authority` if given.
    pub fn authorities(&self, authority: Option<Authority>) -> Vec<Authority> {
        match authority {
            Some(authority) => vec![authority],
            None => self.scheduler.authorities(),
        }
    }

    pub async fn close(self) {
        let Self {
            db, queue, worker, ..
        } = self;
        queue.shut_down().await;
        drop(worker);
        match Arc::try_unwrap(db) {
            Ok(db) => db.close().await,
            Err(_) => tracing::warn!("database still in use, leaving it open"),
        }
    }
}
