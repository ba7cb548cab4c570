// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `WebDAV` client for collection synchronization.

use std::sync::Arc;

use reqwest::Method;

use crate::config::DavConfig;
use crate::error::DavError;
use crate::http::{HttpClient, Precondition};
use crate::request::{MultiGetRequest, Prop, PropFindRequest};
use crate::response::MultiStatusResponse;
use crate::types::{DavResource, ETag, Href, MemberEntry, ResourceFlavor};

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// `WebDAV` client for reading and writing collection members.
///
/// # Example
///
/// ```ignore
/// use davsync_webdav::{AuthMethod, DavClient, DavConfig, Href};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DavConfig {
///     base_url: "https://dav.example.com".to_string(),
///     auth: AuthMethod::Basic {
///         username: "user".to_string(),
///         password: "pass".to_string(),
///     },
///     ..Default::default()
/// };
///
/// let client = DavClient::new(config)?;
/// let state = client.collection_state(&Href::from("/dav/calendars/user/personal/")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DavClient {
    http: Arc<HttpClient>,
}

/// Collection-level properties relevant to change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    /// The collection tag, if the server supports it.
    pub ctag: Option<ETag>,
    /// The display name of the collection.
    pub display_name: Option<String>,
}

impl DavClient {
    /// Creates a new `WebDAV` client.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or HTTP client
    /// initialization fails.
    pub fn new(config: DavConfig) -> Result<Self, DavError> {
        config.validate()?;
        let http = HttpClient::new(config)?;
        Ok(Self {
            http: Arc::new(http),
        })
    }

    /// Reads the collection tag and display name of a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if PROPFIND fails.
    #[tracing::instrument(skip(self))]
    pub async fn collection_state(&self, collection: &Href) -> Result<CollectionState, DavError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::DisplayName);
        propfind.add_property(Prop::GetCTag);

        let multistatus = self.propfind(collection, "0", &propfind).await?;
        Ok(CollectionState {
            ctag: multistatus.collection_ctag(collection),
            display_name: multistatus.collection_display_name(collection),
        })
    }

    /// Lists the members of a collection with their entity tags.
    ///
    /// # Errors
    ///
    /// Returns an error if PROPFIND fails.
    #[tracing::instrument(skip(self))]
    pub async fn list_members(&self, collection: &Href) -> Result<Vec<MemberEntry>, DavError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::ResourceType);
        propfind.add_property(Prop::GetETag);

        let multistatus = self.propfind(collection, "1", &propfind).await?;
        let members = multistatus.into_members(collection);
        tracing::debug!(count = members.len(), "listed collection members");
        Ok(members)
    }

    /// Retrieves multiple resources of a collection by href.
    ///
    /// # Errors
    ///
    /// Returns an error if the multiget report fails.
    #[tracing::instrument(skip(self, hrefs), fields(count = hrefs.len()))]
    pub async fn multiget(
        &self,
        collection: &Href,
        flavor: ResourceFlavor,
        hrefs: &[Href],
    ) -> Result<Vec<DavResource>, DavError> {
        if hrefs.is_empty() {
            return Ok(Vec::new());
        }

        let mut multiget = MultiGetRequest::new(flavor);
        for href in hrefs {
            multiget.add_href(href.clone());
        }
        let xml_body = multiget.build()?;

        let url = self.http.full_url(collection);
        let resp = self
            .http
            .execute(
                collection,
                self.http
                    .build_dav_request("REPORT", &url)?
                    .header("Content-Type", XML_CONTENT_TYPE)
                    .header("Depth", "1")
                    .body(xml_body),
            )
            .await?;

        let xml = resp.text().await?;
        Ok(MultiStatusResponse::from_xml(&xml)?.into_resources())
    }

    /// Gets a single resource by href.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource doesn't exist.
    pub async fn get(&self, href: &Href) -> Result<DavResource, DavError> {
        let url = self.http.full_url(href);
        let resp = self
            .http
            .execute(href, self.http.build_request(Method::GET, &url))
            .await?;

        let etag = HttpClient::extract_etag(&resp);
        let data = resp.text().await?;
        Ok(DavResource::new(href.clone(), etag, data))
    }

    /// Writes a resource body.
    ///
    /// Returns the new entity tag when the server reports one.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::PreconditionFailed`] when the precondition does not
    /// hold, or another error if the write fails.
    #[tracing::instrument(skip(self, body))]
    pub async fn put(
        &self,
        href: &Href,
        flavor: ResourceFlavor,
        body: String,
        precondition: &Precondition,
    ) -> Result<Option<ETag>, DavError> {
        let url = self.http.full_url(href);
        let req = self
            .http
            .build_request(Method::PUT, &url)
            .header("Content-Type", flavor.content_type())
            .body(body);

        let resp = self
            .http
            .execute(href, HttpClient::precondition(req, precondition))
            .await?;

        let etag = HttpClient::extract_etag(&resp);
        if etag.is_none() {
            tracing::debug!("server did not return an ETag");
        }
        Ok(etag)
    }

    /// Deletes a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, href: &Href, precondition: &Precondition) -> Result<(), DavError> {
        let url = self.http.full_url(href);
        let req = self.http.build_request(Method::DELETE, &url);
        self.http
            .execute(href, HttpClient::precondition(req, precondition))
            .await?;
        Ok(())
    }

    async fn propfind(
        &self,
        href: &Href,
        depth: &str,
        request: &PropFindRequest,
    ) -> Result<MultiStatusResponse, DavError> {
        let url = self.http.full_url(href);
        let xml_body = request.build()?;
        let resp = self
            .http
            .execute(
                href,
                self.http
                    .build_dav_request("PROPFIND", &url)?
                    .header("Content-Type", XML_CONTENT_TYPE)
                    .header("Depth", depth)
                    .body(xml_body),
            )
            .await?;

        let xml = resp.text().await?;
        MultiStatusResponse::from_xml(&xml)
    }
}
