// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::types::Href;

/// `WebDAV` client errors.
#[non_exhaustive]
#[derive(Debug)]
pub enum DavError {
    /// The request never got a response: connection, TLS or timeout.
    Transport(String),

    /// The server answered with a status the operation does not expect.
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// XML parsing/writing error.
    Xml(String),

    /// The server refused the credentials.
    Auth(String),

    /// Resource not found.
    NotFound(Href),

    /// A conditional write or delete failed because the resource changed, or
    /// already exists.
    PreconditionFailed(Href),

    /// Invalid response from server.
    InvalidResponse(String),

    /// Configuration error.
    Config(String),
}

impl DavError {
    /// Whether the server rejected the request because the resource changed
    /// since the entity tag the client knew about.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::PreconditionFailed(_))
    }

    /// Whether the same request may succeed later without any change on the
    /// client side.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Request failed: {e}"),
            Self::Status { status, body } if body.is_empty() => {
                write!(f, "Unexpected HTTP status {status}")
            }
            Self::Status { status, body } => write!(f, "Unexpected HTTP status {status}: {body}"),
            Self::Xml(e) => write!(f, "XML error: {e}"),
            Self::Auth(e) => write!(f, "Authentication failed: {e}"),
            Self::NotFound(href) => write!(f, "Resource not found: {href}"),
            Self::PreconditionFailed(href) => write!(f, "Resource changed on server: {href}"),
            Self::InvalidResponse(e) => write!(f, "Invalid server response: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for DavError {}

impl From<reqwest::Error> for DavError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                body: String::new(),
            },
            None => Self::Transport(e.to_string()),
        }
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for DavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}
