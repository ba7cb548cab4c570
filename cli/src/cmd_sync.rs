// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command, arg, value_parser};
use colored::Colorize;
use davsync_core::{Authority, Resync, SyncRequest};

use crate::app::App;
use crate::arg::CommonArgs;

#[derive(Debug, Clone)]
pub struct CmdSync {
    pub account: Option<String>,
    pub authority: Option<Authority>,
    pub resync: Resync,
    pub upload: bool,
    pub verbose: bool,
}

impl CmdSync {
    pub const NAME: &str = "sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .alias("s")
            .about("Synchronize collections with their servers now")
            .arg(CommonArgs::account())
            .arg(CommonArgs::authority())
            .arg(
                arg!(--resync <MODE> "Bypass change detection: `list` compares every entity tag, `full` downloads everything again")
                    .value_parser(value_parser!(Resync)),
            )
            .arg(arg!(--upload "Only push local changes, do not pull"))
            .arg(CommonArgs::verbose())
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            account: CommonArgs::get_account(matches),
            authority: CommonArgs::get_authority(matches),
            resync: matches.get_one("resync").copied().unwrap_or_default(),
            upload: matches.get_flag("upload"),
            verbose: CommonArgs::get_verbose(matches),
        }
    }

    pub fn request(&self) -> SyncRequest {
        SyncRequest {
            manual: true,
            resync: self.resync,
            upload: self.upload,
            from_push: false,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn run(self, app: &mut App) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "synchronizing...");
        let accounts = app.accounts(self.account.as_deref())?;
        let authorities = app.authorities(self.authority);
        let request = self.request();

        for account in &accounts {
            for &authority in &authorities {
                let name = app
                    .scheduler
                    .enqueue_one_time(account, authority, request)
                    .await?;
                if self.verbose {
                    println!("{} {name}", "Queued".cyan());
                }
            }
        }

        let ran = app.worker.run_due(&app.queue).await;
        tracing::debug!(ran, "sync tasks finished");

        let mut retrying = 0;
        for account in &accounts {
            for info in app.scheduler.pending(account).await {
                retrying += 1;
                println!(
                    "{} {} failed (attempt {}), next try at {}",
                    "Retry:".yellow(),
                    info.name,
                    info.attempt,
                    info.next_run
                );
            }
        }

        if retrying == 0 {
            println!("{} {ran} sync task(s) finished", "Done:".green());
        }
        Ok(())
    }
}
