// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsers for `WebDAV` operations.

use quick_xml::events::Event;

use crate::error::DavError;
use crate::types::{DavResource, ETag, Href, MemberEntry};
use crate::xml::read_element_text;

/// `WebDAV` multistatus response.
#[derive(Debug, Clone)]
pub struct MultiStatusResponse {
    /// The response items.
    pub responses: Vec<ResponseItem>,
}

/// Individual response in multistatus.
#[derive(Debug, Clone)]
pub struct ResponseItem {
    /// The href the response describes.
    pub href: Href,
    /// Property groups with their status.
    pub prop_stats: Vec<PropStat>,
    /// Response-level status, used by servers for missing members.
    pub status: Option<String>,
}

/// Property stat with status and value.
#[derive(Debug, Clone)]
pub struct PropStat {
    /// Properties reported under this status.
    pub props: Properties,
    /// Raw status line, e.g. `HTTP/1.1 200 OK`.
    pub status: String,
}

/// Properties understood by the sync client.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    /// `DAV:displayname`.
    pub display_name: Option<String>,
    /// `DAV:getetag`.
    pub get_etag: Option<ETag>,
    /// `CS:getctag`.
    pub get_ctag: Option<ETag>,
    /// `calendar-data` or `address-data`.
    pub data: Option<String>,
    /// Whether `DAV:resourcetype` contains `DAV:collection`.
    pub is_collection: bool,
}

fn is_success(status: &str) -> bool {
    status.contains(" 200") || status.contains(" 207")
}

impl ResponseItem {
    /// Properties from the first successful propstat.
    #[must_use]
    pub fn ok_props(&self) -> Option<&Properties> {
        if self.status.as_deref().is_some_and(|s| !is_success(s)) {
            return None;
        }
        self.prop_stats
            .iter()
            .find(|p| is_success(&p.status))
            .map(|p| &p.props)
    }
}

impl MultiStatusResponse {
    /// Parses multistatus response from XML.
    ///
    /// # Errors
    ///
    /// Returns an error if XML parsing fails.
    pub fn from_xml(xml: &str) -> Result<Self, DavError> {
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().check_end_names = true;

        let mut responses = Vec::new();
        let mut current_response: Option<ResponseItem> = None;
        let mut current_props = Properties::default();
        let mut in_prop = false;
        let mut in_propstat = false;

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::End(ref e) if e.name().local_name().into_inner() == b"multistatus" => break,
                Event::Eof => break,

                Event::Start(ref e) => match e.name().local_name().into_inner() {
                    b"response" => {
                        current_response = Some(ResponseItem {
                            href: Href::new(String::new()),
                            prop_stats: Vec::new(),
                            status: None,
                        });
                    }
                    b"href" if current_response.is_some() && !in_propstat => {
                        let href = read_element_text(&mut reader)?;
                        if let Some(ref mut resp) = current_response {
                            resp.href = Href::new(href.trim().to_string());
                        }
                    }
                    b"propstat" if current_response.is_some() => {
                        in_propstat = true;
                        current_props = Properties::default();
                    }
                    b"prop" if in_propstat => in_prop = true,

                    b"displayname" if in_prop => {
                        let text = read_element_text(&mut reader)?;
                        current_props.display_name = Some(text.trim().to_string());
                    }
                    b"resourcetype" if in_prop => loop {
                        match reader.read_event_into(&mut buf)? {
                            Event::End(ref e)
                                if e.name().local_name().into_inner() == b"resourcetype" =>
                            {
                                break;
                            }
                            Event::Start(ref e) | Event::Empty(ref e)
                                if e.name().local_name().into_inner() == b"collection" =>
                            {
                                current_props.is_collection = true;
                            }
                            Event::Eof => {
                                return Err(DavError::Xml("Unexpected EOF".to_string()));
                            }
                            _ => {}
                        }
                    },
                    b"getetag" if in_prop => {
                        let text = read_element_text(&mut reader)?;
                        current_props.get_etag = Some(ETag::new(text.trim().to_string()));
                    }
                    b"getctag" if in_prop => {
                        let text = read_element_text(&mut reader)?;
                        current_props.get_ctag = Some(ETag::new(text.trim().to_string()));
                    }
                    b"calendar-data" | b"address-data" if in_prop => {
                        current_props.data = Some(read_element_text(&mut reader)?);
                    }
                    b"status" => {
                        let status = read_element_text(&mut reader)?.trim().to_string();
                        if in_propstat {
                            if let Some(ref mut resp) = current_response {
                                resp.prop_stats.push(PropStat {
                                    props: std::mem::take(&mut current_props),
                                    status,
                                });
                            }
                        } else if let Some(ref mut resp) = current_response {
                            resp.status = Some(status);
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) => match e.name().local_name().into_inner() {
                    b"response" => {
                        if let Some(resp) = current_response.take() {
                            responses.push(resp);
                        }
                    }
                    b"propstat" => in_propstat = false,
                    b"prop" => in_prop = false,
                    _ => {}
                },
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { responses })
    }

    /// Collection tag reported for the collection itself.
    #[must_use]
    pub fn collection_ctag(&self, collection: &Href) -> Option<ETag> {
        self.responses
            .iter()
            .filter(|r| r.href.same_collection(collection))
            .find_map(|r| r.ok_props().and_then(|p| p.get_ctag.clone()))
    }

    /// Display name reported for the collection itself.
    #[must_use]
    pub fn collection_display_name(&self, collection: &Href) -> Option<String> {
        self.responses
            .iter()
            .filter(|r| r.href.same_collection(collection))
            .find_map(|r| r.ok_props().and_then(|p| p.display_name.clone()))
    }

    /// Non-collection members of `collection`, with their entity tags.
    #[must_use]
    pub fn into_members(self, collection: &Href) -> Vec<MemberEntry> {
        self.responses
            .into_iter()
            .filter(|r| !r.href.same_collection(collection))
            .filter_map(|r| {
                let props = r.ok_props()?;
                if props.is_collection {
                    return None;
                }
                let etag = props.get_etag.clone();
                Some(MemberEntry { href: r.href, etag })
            })
            .collect()
    }

    /// Downloaded resources; members the server could not deliver are skipped.
    #[must_use]
    pub fn into_resources(self) -> Vec<DavResource> {
        self.responses
            .into_iter()
            .filter_map(|r| {
                let Some(props) = r.ok_props() else {
                    tracing::warn!(href = %r.href, status = ?r.status, "server did not return resource");
                    return None;
                };
                let data = props.data.clone()?;
                let etag = props.get_etag.clone();
                Some(DavResource::new(r.href, etag, data))
            })
            .collect()
    }
}
