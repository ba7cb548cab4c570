// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end workflow tests for the davsync-core crate.
//!
//! These tests drive the SQLite store, the `CalDAV` remote and the scheduler
//! together against a mock server.

mod config_driven;
mod dav_sync;
mod scheduled_sync;
