// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Minimal `WebDAV` client for collection synchronization.
//!
//! Speaks the subset of `WebDAV` (RFC 4918), `CalDAV` (RFC 4791) and `CardDAV`
//! (RFC 6352) that a reconciliation pass needs: collection tags, member
//! listings with entity tags, multiget downloads, and conditional `PUT` and
//! `DELETE`. Resource bodies are carried as opaque text.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(clippy::similar_names, clippy::single_match_else, clippy::match_bool)]

mod client;
mod config;
mod error;
mod http;
mod request;
mod response;
mod types;
mod xml;

pub use crate::client::{CollectionState, DavClient};
pub use crate::config::{AuthMethod, DavConfig};
pub use crate::error::DavError;
pub use crate::http::Precondition;
pub use crate::request::{MultiGetRequest, Prop, PropFindRequest};
pub use crate::response::{MultiStatusResponse, PropStat, Properties, ResponseItem};
pub use crate::types::{DavResource, ETag, Href, MemberEntry, ResourceFlavor};
