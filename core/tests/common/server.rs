// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Mock `CalDAV` server for integration tests.

use davsync_core::{DavConfig, DavRemote};
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A wiremock server answering the requests of one calendar collection.
#[derive(Debug)]
pub struct DavServer {
    pub server: MockServer,
}

impl DavServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    #[must_use]
    pub fn config(&self) -> DavConfig {
        DavConfig {
            base_url: self.server.uri(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn remote(&self) -> DavRemote {
        DavRemote::new(self.config()).expect("Failed to create remote")
    }

    /// Answers depth-0 PROPFINDs of `collection` with its tag and name.
    pub async fn mount_state(&self, collection: &str, ctag: &str, display_name: &str) {
        let body = multistatus(&format!(
            r#"<D:response>
    <D:href>{collection}</D:href>
    <D:propstat>
      <D:prop>
        <D:displayname>{display_name}</D:displayname>
        <CS:getctag>{ctag}</CS:getctag>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
        ));

        Mock::given(method("PROPFIND"))
            .and(path(collection))
            .and(header("Depth", "0"))
            .respond_with(ResponseTemplate::new(207).set_body_raw(body, "application/xml"))
            .mount(&self.server)
            .await;
    }

    /// Answers depth-1 PROPFINDs of `collection` with `(name, etag)` members.
    ///
    /// With `expected`, the server verifies on drop how often it was listed.
    pub async fn mount_members(
        &self,
        collection: &str,
        members: &[(&str, &str)],
        expected: Option<u64>,
    ) {
        let mut responses = format!(
            r#"<D:response>
    <D:href>{collection}</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
        );
        for (name, etag) in members {
            responses += &format!(
                r#"<D:response>
    <D:href>{collection}{name}</D:href>
    <D:propstat>
      <D:prop><D:resourcetype/><D:getetag>{etag}</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
            );
        }

        let mock = Mock::given(method("PROPFIND"))
            .and(path(collection))
            .and(header("Depth", "1"))
            .respond_with(
                ResponseTemplate::new(207).set_body_raw(multistatus(&responses), "application/xml"),
            );
        match expected {
            Some(n) => mock.expect(n).mount(&self.server).await,
            None => mock.mount(&self.server).await,
        }
    }

    /// Answers calendar-multiget REPORTs with `(name, etag, body)` resources.
    pub async fn mount_multiget(&self, collection: &str, resources: &[(&str, &str, &str)]) {
        let responses: String = resources
            .iter()
            .map(|(name, etag, body)| {
                format!(
                    r#"<D:response>
    <D:href>{collection}{name}</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>{etag}</D:getetag>
        <C:calendar-data>{body}</C:calendar-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
                )
            })
            .collect();

        Mock::given(method("REPORT"))
            .and(path(collection))
            .and(body_string_contains("calendar-multiget"))
            .respond_with(
                ResponseTemplate::new(207).set_body_raw(multistatus(&responses), "application/xml"),
            )
            .mount(&self.server)
            .await;
    }

    /// Accepts creations of new members of `collection`, returning `etag`.
    pub async fn mount_create(&self, collection: &str, etag: &str) {
        Mock::given(method("PUT"))
            .and(path_regex(format!("^{collection}[^/]+$")))
            .and(header("If-None-Match", "*"))
            .respond_with(ResponseTemplate::new(201).insert_header("ETag", etag))
            .mount(&self.server)
            .await;
    }

    /// Rejects every write to `member` whose precondition no longer holds.
    pub async fn mount_conflict(&self, member: &str) {
        Mock::given(method("PUT"))
            .and(path(member))
            .respond_with(ResponseTemplate::new(412))
            .mount(&self.server)
            .await;
    }

    /// Accepts deletion of `member`.
    pub async fn mount_delete(&self, member: &str) {
        Mock::given(method("DELETE"))
            .and(path(member))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Bodies of the PUT requests received so far.
    pub async fn uploaded_bodies(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == "PUT")
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .collect()
    }
}

fn multistatus(responses: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav" xmlns:CS="http://calendarserver.org/ns/">
  {responses}
</D:multistatus>"#
    )
}
