// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_core::Authority;
use clap::{Arg, ArgMatches, arg, value_parser};

#[derive(Debug, Clone, Copy)]
pub struct CommonArgs;

impl CommonArgs {
    pub fn account() -> Arg {
        arg!(-a --account <ACCOUNT> "Only the account with this name")
    }

    pub fn get_account(matches: &ArgMatches) -> Option<String> {
        matches.get_one::<String>("account").cloned()
    }

    pub fn authority() -> Arg {
        arg!(--authority <AUTHORITY> "Only this kind of collections")
            .value_parser(value_parser!(Authority))
    }

    pub fn get_authority(matches: &ArgMatches) -> Option<Authority> {
        matches.get_one("authority").copied()
    }

    pub fn verbose() -> Arg {
        arg!(-v --verbose "Show more detailed information")
    }

    pub fn get_verbose(matches: &ArgMatches) -> bool {
        matches.get_flag("verbose")
    }
}
