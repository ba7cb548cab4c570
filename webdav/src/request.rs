// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for `WebDAV` operations.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::DavError;
use crate::types::{Href, ResourceFlavor};
use crate::xml::ns;

/// PROPFIND request builder.
#[derive(Debug)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

/// Properties to request in PROPFIND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    /// Display name.
    DisplayName,
    /// Resource type.
    ResourceType,
    /// `ETag`.
    GetETag,
    /// Collection tag (calendar server extension).
    GetCTag,
}

impl Prop {
    const fn name(self) -> &'static str {
        match self {
            Self::DisplayName => "displayname",
            Self::ResourceType => "resourcetype",
            Self::GetETag => "getetag",
            Self::GetCTag => "getctag",
        }
    }

    const fn is_calendarserver(self) -> bool {
        matches!(self, Self::GetCTag)
    }
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <D:propfind xmlns:D="DAV:">
        let mut propfind = BytesStart::new("D:propfind");
        propfind.push_attribute(("xmlns:D", ns::DAV));
        if self.props.iter().any(|p| p.is_calendarserver()) {
            propfind.push_attribute(("xmlns:CS", ns::CALENDARSERVER));
        }
        writer.write_event(Event::Start(propfind))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        for prop in &self.props {
            let prefix = if prop.is_calendarserver() { "CS" } else { "D" };
            let tag = format!("{prefix}:{}", prop.name());
            writer.write_event(Event::Start(BytesStart::new(tag.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        writer.write_event(Event::End(BytesEnd::new("D:propfind")))?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
    }
}

impl Default for PropFindRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Multiget REPORT builder (`calendar-multiget` or `addressbook-multiget`).
#[derive(Debug)]
pub struct MultiGetRequest {
    flavor: ResourceFlavor,
    hrefs: Vec<Href>,
}

impl MultiGetRequest {
    /// Creates a new multiget request for the given collection flavor.
    #[must_use]
    pub const fn new(flavor: ResourceFlavor) -> Self {
        Self {
            flavor,
            hrefs: Vec::new(),
        }
    }

    /// Adds an href to fetch.
    pub fn add_href(&mut self, href: Href) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Builds the XML body for the multiget request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let (root, data, namespace) = match self.flavor {
            ResourceFlavor::Calendar => ("C:calendar-multiget", "C:calendar-data", ns::CALDAV),
            ResourceFlavor::AddressBook => {
                ("C:addressbook-multiget", "C:address-data", ns::CARDDAV)
            }
        };

        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut start = BytesStart::new(root);
        start.push_attribute(("xmlns:D", ns::DAV));
        start.push_attribute(("xmlns:C", namespace));
        writer.write_event(Event::Start(start))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        writer.write_event(Event::Start(BytesStart::new("D:getetag")))?;
        writer.write_event(Event::End(BytesEnd::new("D:getetag")))?;
        writer.write_event(Event::Start(BytesStart::new(data)))?;
        writer.write_event(Event::End(BytesEnd::new(data)))?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        for href in &self.hrefs {
            writer.write_event(Event::Start(BytesStart::new("D:href")))?;
            writer.write_event(Event::Text(BytesText::new(href.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new("D:href")))?;
        }

        writer.write_event(Event::End(BytesEnd::new(root)))?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
    }
}
