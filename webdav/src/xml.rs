// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for `WebDAV` processing.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;

use crate::error::DavError;

/// XML namespaces used in `WebDAV` and its extensions.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// `CardDAV` namespace.
    pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

    /// Calendar server extensions, home of `getctag`.
    pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";
}

/// Reads the text content of the element whose start tag was just consumed.
///
/// Text, CDATA sections and entity references are concatenated until the
/// matching end tag, so bodies like iCalendar data survive escaping.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn read_element_text(reader: &mut Reader<&[u8]>) -> Result<String, DavError> {
    let mut text = String::new();
    let mut depth = 1;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Text(e) => text.push_str(&e.decode().map_err(quick_xml::Error::from)?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(&e).into_owned();
                text.push_str(&resolve_entity(&name)?);
            }
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

fn resolve_entity(name: &str) -> Result<String, DavError> {
    if let Some(value) = resolve_predefined_entity(name) {
        return Ok(value.to_string());
    }

    let code = if let Some(hex) = name.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    };

    code.and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| DavError::Xml(format!("Unknown entity: &{name};")))
}
