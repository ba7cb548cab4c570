// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::time::Duration;

use clap::{ArgMatches, Command, arg, value_parser};
use colored::Colorize;
use davsync_core::SyncRequest;

use crate::app::App;

#[derive(Debug, Clone, Copy)]
pub struct CmdDaemon {
    pub tick: Duration,
}

impl CmdDaemon {
    pub const NAME: &str = "daemon";

    const DEFAULT_TICK_SECS: u64 = 5;

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Keep running and synchronize periodically until interrupted")
            .arg(
                arg!(--tick <SECONDS> "How often to look for due sync tasks")
                    .value_parser(value_parser!(u64).range(1..))
                    .default_value("5"),
            )
    }

    pub fn from(matches: &ArgMatches) -> Self {
        let secs = matches
            .get_one::<u64>("tick")
            .copied()
            .unwrap_or(Self::DEFAULT_TICK_SECS);
        Self {
            tick: Duration::from_secs(secs),
        }
    }

    #[tracing::instrument(skip_all, fields(tick = ?self.tick))]
    pub async fn run(self, app: &mut App) -> Result<(), Box<dyn Error>> {
        let accounts = app.accounts(None)?;
        let interval = app.config.scheduler.periodic_interval();
        let wifi_only = app.config.scheduler.wifi_only;

        for account in &accounts {
            if let Some(interval) = interval {
                for authority in app.scheduler.authorities() {
                    app.scheduler
                        .restart_periodic(account, authority, interval, wifi_only)
                        .await?;
                }
            }
            for (authority, result) in app
                .scheduler
                .enqueue_one_time_all_authorities(account, SyncRequest::default())
                .await
            {
                if let Err(err) = result {
                    println!("{} {account} {authority}: {err}", "Warning:".yellow());
                }
            }
        }

        match interval {
            Some(interval) => tracing::info!(?interval, "periodic sync enabled"),
            None => tracing::info!("no periodic interval configured, syncing once"),
        }
        println!("{} press Ctrl-C to stop", "Running:".green());

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    break;
                }
                _ = ticker.tick() => {
                    let ran = app.worker.run_due(&app.queue).await;
                    if ran > 0 {
                        tracing::debug!(ran, "ran due sync tasks");
                    }
                }
            }
        }

        let mut cancelled = 0;
        for account in &accounts {
            cancelled += app.scheduler.cancel_all_work(account).await;
        }
        println!("{} cancelled {cancelled} pending task(s)", "Stopped:".green());
        Ok(())
    }
}
