// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! [`Remote`] backed by a `WebDAV` server.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use davsync_webdav::{DavClient, DavConfig, DavError, ETag, Href, Precondition, ResourceFlavor};

use crate::error::RemoteError;
use crate::record::{Collection, ResourceContent, ResourceRow};
use crate::remote::{Remote, RemoteChanges, RemoteEntry, RemoteFactory, RemoteResource};
use crate::token::{CollectionTag, EntityTag};
use crate::types::{Account, ResourceKind};

/// Talks to the collections of one account over `CalDAV`/`CardDAV`.
#[derive(Debug, Clone)]
pub struct DavRemote {
    client: DavClient,
}

impl DavRemote {
    /// # Errors
    ///
    /// Returns an error if the client cannot be created from `config`.
    pub fn new(config: DavConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            client: DavClient::new(config)?,
        })
    }

    #[must_use]
    pub fn from_client(client: DavClient) -> Self {
        Self { client }
    }
}

/// One [`DavRemote`] per configured account.
#[derive(Debug, Clone, Default)]
pub struct DavRemotes {
    remotes: HashMap<Account, Arc<DavRemote>>,
}

impl DavRemotes {
    /// # Errors
    ///
    /// Returns an error if a client cannot be created for one of the accounts.
    pub fn new<I>(accounts: I) -> Result<Self, RemoteError>
    where
        I: IntoIterator<Item = (Account, DavConfig)>,
    {
        let remotes = accounts
            .into_iter()
            .map(|(account, config)| Ok((account, Arc::new(DavRemote::new(config)?))))
            .collect::<Result<_, RemoteError>>()?;
        Ok(Self { remotes })
    }
}

impl RemoteFactory for DavRemotes {
    fn remote(&self, account: &Account) -> Result<Arc<dyn Remote>, RemoteError> {
        match self.remotes.get(account) {
            Some(remote) => Ok(remote.clone()),
            None => Err(RemoteError::Failure(format!(
                "no server configured for account {account}"
            ))),
        }
    }
}

fn flavor(kind: ResourceKind) -> ResourceFlavor {
    match kind {
        ResourceKind::Contact => ResourceFlavor::AddressBook,
        ResourceKind::Event | ResourceKind::Task => ResourceFlavor::Calendar,
    }
}

fn member_href(collection: &Collection, resource: &ResourceRow) -> Result<Href, RemoteError> {
    let name = resource
        .remote_name
        .as_deref()
        .ok_or_else(|| RemoteError::Failure(format!("resource {} has no remote name", resource.id)))?;
    Ok(Href::from(collection.url.as_str()).join(name))
}

fn entity_tag(etag: ETag) -> EntityTag {
    EntityTag::from(etag.into_inner())
}

/// Value of the first `UID` property of an iCalendar or vCard body.
fn extract_uid(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        // property parameters follow the name after a semicolon
        let name = name.split(';').next()?;
        name.eq_ignore_ascii_case("UID")
            .then(|| value.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

#[async_trait]
impl Remote for DavRemote {
    #[tracing::instrument(skip_all, fields(id = %resource.id))]
    async fn upload(
        &self,
        collection: &Collection,
        resource: &ResourceRow,
        content: &ResourceContent,
    ) -> Result<Option<EntityTag>, RemoteError> {
        let href = member_href(collection, resource)?;
        let precondition = match &resource.etag {
            None => Precondition::IfNoneMatchAny,
            Some(etag) => Precondition::IfMatch(ETag::from(etag.as_str())),
        };

        let etag = self
            .client
            .put(&href, flavor(collection.kind), content.body.clone(), &precondition)
            .await?;
        Ok(etag.map(entity_tag))
    }

    #[tracing::instrument(skip_all, fields(id = %resource.id))]
    async fn delete(
        &self,
        collection: &Collection,
        resource: &ResourceRow,
    ) -> Result<(), RemoteError> {
        let href = member_href(collection, resource)?;
        let precondition = resource
            .etag
            .as_ref()
            .map_or(Precondition::None, |etag| Precondition::IfMatch(ETag::from(etag.as_str())));

        match self.client.delete(&href, &precondition).await {
            Ok(()) => Ok(()),
            Err(DavError::NotFound(_)) => {
                tracing::debug!(%href, "resource already gone");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch_changes(
        &self,
        collection: &Collection,
        known: Option<&CollectionTag>,
    ) -> Result<RemoteChanges, RemoteError> {
        let href = Href::from(collection.url.as_str());
        let state = self.client.collection_state(&href).await?;
        let ctag = state.ctag.map(|tag| CollectionTag::from(tag.into_inner()));

        if let (Some(known), Some(current)) = (known, &ctag) {
            if known == current {
                return Ok(RemoteChanges::Unchanged);
            }
        }

        let entries = self
            .client
            .list_members(&href)
            .await?
            .into_iter()
            .filter_map(|member| {
                let name = member.href.file_name()?.to_string();
                Some(RemoteEntry {
                    name,
                    etag: member.etag.map(entity_tag),
                })
            })
            .collect();

        Ok(RemoteChanges::Changed {
            ctag,
            display_name: state.display_name,
            entries,
        })
    }

    async fn download(
        &self,
        collection: &Collection,
        names: &[String],
    ) -> Result<Vec<RemoteResource>, RemoteError> {
        let href = Href::from(collection.url.as_str());
        let hrefs: Vec<Href> = names.iter().map(|name| href.join(name)).collect();

        let resources = self
            .client
            .multiget(&href, flavor(collection.kind), &hrefs)
            .await?;

        Ok(resources
            .into_iter()
            .filter_map(|resource| {
                let name = resource.href.file_name()?.to_string();
                Some(RemoteResource {
                    name,
                    etag: resource.etag.map(entity_tag),
                    uid: extract_uid(&resource.data),
                    content: ResourceContent::new(resource.data),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_uid_reads_first_uid_property() {
        let body = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:abc-123\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        assert_eq!(extract_uid(body).as_deref(), Some("abc-123"));
    }

    #[test]
    fn extract_uid_accepts_parameters_and_lowercase() {
        assert_eq!(
            extract_uid("BEGIN:VCARD\nuid;VALUE=text:urn:uuid:42\nEND:VCARD").as_deref(),
            Some("urn:uuid:42")
        );
    }

    #[test]
    fn extract_uid_missing() {
        assert_eq!(extract_uid("BEGIN:VCARD\nFN:Jane\nEND:VCARD"), None);
        assert_eq!(extract_uid("UID:\n"), None);
    }

    #[test]
    fn dav_remotes_unknown_account() {
        let remotes = DavRemotes::new([(
            Account::new("alice"),
            DavConfig {
                base_url: "http://localhost".to_string(),
                ..Default::default()
            },
        )])
        .unwrap();
        assert!(remotes.remote(&Account::new("alice")).is_ok());
        assert!(remotes.remote(&Account::new("bob")).is_err());
    }

    #[test]
    fn dav_remotes_rejects_empty_base_url() {
        let err = DavRemotes::new([(Account::new("alice"), DavConfig::default())]).unwrap_err();
        assert!(matches!(err, RemoteError::Failure(_)));
    }

    #[test]
    fn contacts_use_address_book_flavor() {
        assert_eq!(flavor(ResourceKind::Contact), ResourceFlavor::AddressBook);
        assert_eq!(flavor(ResourceKind::Task), ResourceFlavor::Calendar);
    }
}
