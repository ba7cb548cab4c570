// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command};
use colored::Colorize;
use davsync_core::{Authority, Collection, Filter, LocalStore, StoreError};

use crate::app::App;
use crate::arg::CommonArgs;

#[derive(Debug, Clone)]
pub struct CmdStatus {
    pub account: Option<String>,
    pub verbose: bool,
}

impl CmdStatus {
    pub const NAME: &str = "status";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Show collections and their unsynchronized local changes")
            .arg(CommonArgs::account())
            .arg(CommonArgs::verbose())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            account: CommonArgs::get_account(matches),
            verbose: CommonArgs::get_verbose(matches),
        }
    }

    pub async fn run(self, app: &mut App) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "showing status...");
        let accounts = app.accounts(self.account.as_deref())?;
        for account in accounts {
            println!("{}", account.to_string().bold());
            for authority in Authority::ALL {
                for collection in app.db.collections(&account, authority).await? {
                    let changes = LocalChanges::count(app.db.as_ref(), &collection).await?;
                    println!("  {}", self.format(&collection, changes));
                }
            }
        }
        Ok(())
    }

    fn format(&self, collection: &Collection, changes: LocalChanges) -> String {
        let name = collection
            .display_name
            .as_deref()
            .unwrap_or(collection.url.as_str());
        let mut line = format!("{} {name}", format!("[{}]", collection.authority).dimmed());

        if !collection.sync_enabled {
            line += &format!(" {}", "disabled".dimmed());
        } else if changes.is_empty() {
            line += &format!(" {}", "up to date".green());
        } else {
            line += &format!(
                " {}",
                format!(
                    "{} modified, {} deleted",
                    changes.modified, changes.deleted
                )
                .yellow()
            );
        }

        if self.verbose {
            let ctag = collection.ctag.as_ref().map_or("-", |c| c.as_str());
            line += &format!("\n      url: {}\n      ctag: {ctag}", collection.url);
        }
        line
    }
}

/// Local changes of a collection not yet pushed to the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LocalChanges {
    modified: usize,
    deleted: usize,
}

impl LocalChanges {
    async fn count<S: LocalStore + ?Sized>(
        store: &S,
        collection: &Collection,
    ) -> Result<Self, StoreError> {
        let schema = collection.kind.schema();
        let modified = store
            .query(schema, &Filter::collection(collection.id).dirty(true).deleted(false))
            .await?
            .len();
        let deleted = store
            .query(schema, &Filter::collection(collection.id).deleted(true))
            .await?
            .len();
        Ok(Self { modified, deleted })
    }

    fn is_empty(self) -> bool {
        self == Self::default()
    }
}
