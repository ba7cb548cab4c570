// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - Test data factories (fixtures)
//! - A mock `CalDAV` server built on wiremock
//! - Temporary directory management

mod fixtures;
mod server;
mod temp_dir;

#[allow(unused_imports)]
pub use fixtures::{calendar_collection, config_toml, ical_event};
#[allow(unused_imports)]
pub use server::DavServer;
pub use temp_dir::setup_temp_dirs;
