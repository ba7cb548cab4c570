// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::time::Duration;

use reqwest::RequestBuilder;

use crate::error::DavError;
use crate::types::Href;

/// How requests authenticate against the server.
#[derive(Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthMethod {
    /// No authentication.
    #[default]
    None,
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Bearer token, as issued by an OAuth provider.
    Bearer {
        /// Token.
        token: String,
    },
}

impl AuthMethod {
    pub(crate) fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            AuthMethod::None => req,
            AuthMethod::Basic { username, password } => req.basic_auth(username, Some(password)),
            AuthMethod::Bearer { token } => req.bearer_auth(token),
        }
    }
}

// Credentials end up in config dumps and tracing fields otherwise.
impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::None => f.write_str("None"),
            AuthMethod::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            AuthMethod::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// Connection settings of one server account.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DavConfig {
    /// Scheme and authority of the server, optionally with a path prefix.
    /// Collection hrefs are resolved against it.
    pub base_url: String,

    /// Credentials sent with every request.
    #[serde(default)]
    pub auth: AuthMethod,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Value of the `User-Agent` header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("davsync-webdav/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for DavConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth: AuthMethod::default(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl DavConfig {
    /// Checks the settings before any request is made.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Config`] if the base URL is empty or not HTTP(S),
    /// or the timeout is zero.
    pub fn validate(&self) -> Result<(), DavError> {
        if self.base_url.is_empty() {
            return Err(DavError::Config("base_url must not be empty".to_string()));
        }
        if !is_absolute(&self.base_url) {
            return Err(DavError::Config(format!(
                "base_url must start with http:// or https://, got {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(DavError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Absolute URL of `href`; absolute hrefs are returned unchanged.
    #[must_use]
    pub fn url(&self, href: &Href) -> String {
        if is_absolute(href.as_str()) {
            return href.to_string();
        }
        format!("{}{}", self.base_url.trim_end_matches('/'), href)
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
