// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface of davsync.

mod app;
mod arg;
mod cli;
mod cmd_daemon;
mod cmd_generate_completion;
mod cmd_status;
mod cmd_sync;

pub use crate::cli::{Cli, Commands, run};
