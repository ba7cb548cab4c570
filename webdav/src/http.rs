// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and `ETag` handling.

use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::config::DavConfig;
use crate::error::DavError;
use crate::types::{ETag, Href};

/// Conditional request header attached to a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional write.
    None,
    /// `If-None-Match: *`, the resource must not exist yet.
    IfNoneMatchAny,
    /// `If-Match: <etag>`, the resource must still be at this version.
    IfMatch(ETag),
}

/// HTTP client for `WebDAV` operations.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: DavConfig,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: DavConfig) -> Result<Self, DavError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    /// Builds a request with authentication headers.
    pub fn build_request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        self.config.auth.authorize(self.client.request(method, url))
    }

    /// Builds a request with a `WebDAV` extension method such as `PROPFIND`.
    ///
    /// # Errors
    ///
    /// Returns an error if the method name is not a valid token.
    pub fn build_dav_request(&self, method: &str, url: &str) -> Result<RequestBuilder, DavError> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|e| DavError::Config(format!("Invalid method: {e}")))?;
        Ok(self.build_request(method, url))
    }

    /// Executes a request and checks for HTTP errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns an error status code.
    pub async fn execute(&self, href: &Href, req: RequestBuilder) -> Result<Response, DavError> {
        let resp = req.send().await?;

        match resp.status() {
            StatusCode::OK
            | StatusCode::CREATED
            | StatusCode::NO_CONTENT
            | StatusCode::MULTI_STATUS => Ok(resp),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(DavError::NotFound(href.clone())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(DavError::Auth(resp.status().to_string()))
            }
            StatusCode::PRECONDITION_FAILED => Err(DavError::PreconditionFailed(href.clone())),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(DavError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Attaches the conditional header for a write.
    pub fn precondition(req: RequestBuilder, precondition: &Precondition) -> RequestBuilder {
        match precondition {
            Precondition::None => req,
            Precondition::IfNoneMatchAny => req.header("If-None-Match", "*"),
            Precondition::IfMatch(etag) => req.header("If-Match", etag.as_str()),
        }
    }

    /// Extracts `ETag` from response headers.
    ///
    /// Servers may omit it after a write, in which case the caller has to
    /// learn the new version from the next listing.
    pub fn extract_etag(resp: &Response) -> Option<ETag> {
        resp.headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(|s| ETag::new(s.to_string()))
    }

    /// Builds full URL from href.
    pub fn full_url(&self, href: &Href) -> String {
        self.config.url(href)
    }
}
