// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsing tests.

use davsync_webdav::{ETag, Href, MultiStatusResponse};

#[test]
fn response_parse_multistatus_basic() {
    let xml = "\
<?xml version=\"1.0\" encoding=\"utf-8\" ?>
<D:multistatus xmlns:D=\"DAV:\">
  <D:response>
    <D:href>/calendars/user/event1.ics</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>\"12345\"</D:getetag>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>";

    let response = MultiStatusResponse::from_xml(xml).expect("Failed to parse");

    assert_eq!(response.responses.len(), 1);
    let item = &response.responses[0];
    assert_eq!(item.href.as_str(), "/calendars/user/event1.ics");
    assert_eq!(item.prop_stats.len(), 1);
    assert_eq!(
        item.ok_props().and_then(|p| p.get_etag.clone()),
        Some(ETag::from("\"12345\""))
    );
}

#[test]
fn response_failed_propstat_is_ignored() {
    let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/">
  <D:response>
    <D:href>/dav/cal/</D:href>
    <D:propstat>
      <D:prop><CS:getctag/></D:prop>
      <D:status>HTTP/1.1 404 Not Found</D:status>
    </D:propstat>
    <D:propstat>
      <D:prop><D:displayname>Work</D:displayname></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let response = MultiStatusResponse::from_xml(xml).expect("Failed to parse");
    let collection = Href::from("/dav/cal");

    assert_eq!(response.collection_ctag(&collection), None);
    assert_eq!(
        response.collection_display_name(&collection).as_deref(),
        Some("Work")
    );
}

#[test]
fn response_members_exclude_sub_collections() {
    let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/dav/book/</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/book/nested/</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/book/c.vcf</D:href>
    <D:propstat>
      <D:prop><D:resourcetype/><D:getetag>W/"c1"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let members = MultiStatusResponse::from_xml(xml)
        .expect("Failed to parse")
        .into_members(&Href::from("/dav/book/"));

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].href.as_str(), "/dav/book/c.vcf");
    assert_eq!(members[0].etag, Some(ETag::from("W/\"c1\"")));
}

#[test]
fn response_address_data_with_cdata_is_preserved() {
    let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:carddav">
  <D:response>
    <D:href>/dav/book/c.vcf</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>"c1"</D:getetag>
        <C:address-data><![CDATA[BEGIN:VCARD
FN:<Jane>
END:VCARD]]></C:address-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let resources = MultiStatusResponse::from_xml(xml)
        .expect("Failed to parse")
        .into_resources();

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].data, "BEGIN:VCARD\nFN:<Jane>\nEND:VCARD");
}
