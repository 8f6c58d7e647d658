//! Token-authenticated client for the owner's content in an ArcGIS portal.

use crate::catalog::HostedTableCatalog;
use crate::wire::{
    GroupSearch, ItemGroups, ItemRecord, ServiceInfo, ShareResponse, SuccessResponse,
    TokenResponse, UserContent, send, split_capabilities,
};
use agol_audit_core::checks::{EXTRACT_CAPABILITY, ROOT_FOLDER};
use agol_audit_core::{Lookup, Portal, PortalError, RemoteItem};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::BTreeMap;

pub const DEFAULT_ORG: &str = "https://www.arcgis.com";

const CLIENT_REFERER: &str = "https://agol-validator.local";
const TOKEN_MINUTES: &str = "120";
const PAGE_SIZE: &str = "100";
const FEATURE_SERVICE: &str = "Feature Service";

/// An authenticated session for one portal user.
///
/// Folder and group directories are fetched once and cached; the run is
/// single-threaded, so the caches use `RefCell`. Items moved during the run
/// are tracked so later calls address their new folder.
pub struct PortalClient {
    http: Client,
    rest_root: String,
    user: String,
    token: String,
    folders: RefCell<Option<BTreeMap<String, String>>>,
    groups: RefCell<Option<BTreeMap<String, String>>>,
    moved: RefCell<BTreeMap<String, Option<String>>>,
}

impl PortalClient {
    /// Exchange credentials for a token. Any failure is an `Auth` error.
    pub fn connect(org: &str, user: &str, password: &str) -> Result<Self, PortalError> {
        let auth_error = |message: String| PortalError::Auth {
            user: user.to_string(),
            message,
        };

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(CLIENT_REFERER));
        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| auth_error(e.to_string()))?;

        let rest_root = format!("{}/sharing/rest", org.trim_end_matches('/'));
        let endpoint = format!("{rest_root}/generateToken");
        let request = http.post(&endpoint).form(&[
            ("username", user),
            ("password", password),
            ("referer", CLIENT_REFERER),
            ("client", "referer"),
            ("expiration", TOKEN_MINUTES),
            ("f", "json"),
        ]);
        let token = match send::<TokenResponse>("generateToken", &endpoint, request) {
            Ok(response) => response.token,
            Err(PortalError::Rejected { message, .. })
            | Err(PortalError::Transport { message, .. }) => return Err(auth_error(message)),
            Err(other) => return Err(other),
        };
        tracing::info!(user, org, "authenticated");

        Ok(Self {
            http,
            rest_root,
            user: user.to_string(),
            token,
            folders: RefCell::new(None),
            groups: RefCell::new(None),
            moved: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Catalog source reading a hosted metatable layer with this session.
    pub fn hosted_table(&self, url: impl Into<String>) -> HostedTableCatalog {
        HostedTableCatalog::new(self.http.clone(), url, Some(self.token.clone()))
    }

    fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PortalError> {
        let request = self
            .http
            .get(url)
            .query(query)
            .query(&[("f", "json"), ("token", self.token.as_str())]);
        send(operation, url, request)
    }

    fn post<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, PortalError> {
        let mut fields: Vec<(&str, &str)> = form.to_vec();
        fields.push(("f", "json"));
        fields.push(("token", self.token.as_str()));
        let request = self.http.post(url).form(&fields);
        send(operation, url, request)
    }

    fn post_success(
        &self,
        operation: &str,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<(), PortalError> {
        let response: SuccessResponse = self.post(operation, url, form)?;
        if response.success {
            Ok(())
        } else {
            Err(PortalError::rejected(operation, "portal reported failure"))
        }
    }

    fn content_url(&self, folder_id: Option<&str>) -> String {
        match folder_id {
            Some(id) => format!("{}/content/users/{}/{id}", self.rest_root, self.user),
            None => format!("{}/content/users/{}", self.rest_root, self.user),
        }
    }

    /// Every page of one folder listing.
    fn list_folder(&self, folder_id: Option<&str>) -> Result<UserContent, PortalError> {
        let url = self.content_url(folder_id);
        let mut start = 1i64;
        let mut listing = UserContent {
            items: Vec::new(),
            folders: Vec::new(),
            next_start: -1,
        };
        loop {
            let start_text = start.to_string();
            let page: UserContent = self.get(
                "list content",
                &url,
                &[("start", start_text.as_str()), ("num", PAGE_SIZE)],
            )?;
            listing.items.extend(page.items);
            if listing.folders.is_empty() {
                listing.folders = page.folders;
            }
            if page.next_start <= start {
                break;
            }
            start = page.next_start;
        }
        Ok(listing)
    }

    fn item_groups(&self, item_id: &str) -> Result<Vec<String>, PortalError> {
        let url = format!("{}/content/items/{item_id}/groups", self.rest_root);
        let groups: ItemGroups = self.get("item groups", &url, &[])?;
        Ok(groups.titles())
    }

    fn service_capabilities(&self, service_url: &str) -> Result<Vec<String>, PortalError> {
        let info: ServiceInfo = self.get("service info", service_url, &[])?;
        match info.capabilities {
            Some(raw) => Ok(split_capabilities(&raw)),
            None => Err(PortalError::rejected(
                "service info",
                "response has no capabilities",
            )),
        }
    }

    fn remote_item(&self, record: ItemRecord, folder: Option<&str>) -> RemoteItem {
        let groups = Lookup::from_result(self.item_groups(&record.id));
        if let Lookup::Unavailable(reason) = &groups {
            tracing::warn!(item = %record.id, %reason, "could not read item groups");
        }
        let capabilities = match record.url.as_deref() {
            Some(url) => Lookup::from_result(self.service_capabilities(url)),
            None => Lookup::Unavailable("item has no service url".to_string()),
        };
        if let Lookup::Unavailable(reason) = &capabilities {
            tracing::debug!(item = %record.id, %reason, "could not read service capabilities");
        }

        RemoteItem {
            item_id: record.id,
            title: record.title,
            tags: record.tags,
            folder: folder.map(str::to_string),
            groups,
            protected: record.protected,
            capabilities,
            service_url: record.url,
        }
    }

    /// Folder title to id, cached after the first listing.
    fn folder_id(&self, title: &str) -> Result<Option<String>, PortalError> {
        if self.folders.borrow().is_none() {
            let root = self.list_folder(None)?;
            self.remember_folders(&root);
        }
        Ok(self
            .folders
            .borrow()
            .as_ref()
            .and_then(|folders| folders.get(title).cloned()))
    }

    fn remember_folders(&self, root: &UserContent) {
        let folders = root
            .folders
            .iter()
            .map(|folder| (folder.title.clone(), folder.id.clone()))
            .collect();
        *self.folders.borrow_mut() = Some(folders);
    }

    /// Group title to id over every group visible to the user.
    fn group_id(&self, title: &str) -> Result<Option<String>, PortalError> {
        if self.groups.borrow().is_none() {
            let url = format!("{}/community/groups", self.rest_root);
            let mut directory = BTreeMap::new();
            let mut start = 1i64;
            loop {
                let start_text = start.to_string();
                let page: GroupSearch = self.get(
                    "search groups",
                    &url,
                    &[
                        ("q", "title:*"),
                        ("start", start_text.as_str()),
                        ("num", PAGE_SIZE),
                    ],
                )?;
                for group in page.results {
                    directory.entry(group.title).or_insert(group.id);
                }
                if page.next_start <= start {
                    break;
                }
                start = page.next_start;
            }
            tracing::debug!(groups = directory.len(), "loaded group directory");
            *self.groups.borrow_mut() = Some(directory);
        }
        Ok(self
            .groups
            .borrow()
            .as_ref()
            .and_then(|groups| groups.get(title).cloned()))
    }

    /// `/content/users/{user}/[{folderId}/]items/{id}`
    fn item_url(&self, item: &RemoteItem) -> Result<String, PortalError> {
        let folder = match self.moved.borrow().get(&item.item_id) {
            Some(moved) => moved.clone(),
            None => item.folder.clone(),
        };
        let folder_id = match folder.as_deref() {
            Some(title) => Some(self.folder_id(title)?.ok_or_else(|| PortalError::Unknown {
                kind: "folder".to_string(),
                name: title.to_string(),
            })?),
            None => None,
        };
        Ok(format!(
            "{}/items/{}",
            self.content_url(folder_id.as_deref()),
            item.item_id
        ))
    }
}

/// Admin endpoint of a hosted feature service.
fn admin_url(service_url: &str) -> Option<String> {
    service_url
        .contains("/rest/services/")
        .then(|| service_url.replacen("/rest/services/", "/rest/admin/services/", 1))
}

impl Portal for PortalClient {
    fn feature_service_items(&self) -> Result<Vec<RemoteItem>, PortalError> {
        let root = self.list_folder(None)?;
        self.remember_folders(&root);

        let mut listings = vec![(None, root.items)];
        for folder in &root.folders {
            let listing = self.list_folder(Some(&folder.id))?;
            listings.push((Some(folder.title.clone()), listing.items));
        }

        let mut items = Vec::new();
        for (folder, records) in listings {
            for record in records
                .into_iter()
                .filter(|record| record.item_type == FEATURE_SERVICE)
            {
                items.push(self.remote_item(record, folder.as_deref()));
            }
        }
        tracing::info!(user = %self.user, items = items.len(), "enumerated feature services");
        Ok(items)
    }

    fn update_details(
        &self,
        item: &RemoteItem,
        title: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<(), PortalError> {
        let url = format!("{}/update", self.item_url(item)?);
        let joined = tags.map(|tags| tags.join(","));
        let mut form: Vec<(&str, &str)> = Vec::new();
        if let Some(title) = title {
            form.push(("title", title));
        }
        if let Some(tags) = joined.as_deref() {
            form.push(("tags", tags));
            if tags.is_empty() {
                form.push(("clearEmptyFields", "true"));
            }
        }
        self.post_success("update", &url, &form)
    }

    fn share_with_group(&self, item: &RemoteItem, group_title: &str) -> Result<(), PortalError> {
        let group_id = self
            .group_id(group_title)?
            .ok_or_else(|| PortalError::Unknown {
                kind: "group".to_string(),
                name: group_title.to_string(),
            })?;
        let url = format!("{}/share", self.item_url(item)?);
        let response: ShareResponse = self.post(
            "share",
            &url,
            &[("everyone", "true"), ("groups", group_id.as_str())],
        )?;
        if response.not_shared_with.is_empty() {
            Ok(())
        } else {
            Err(PortalError::rejected(
                "share",
                format!("not shared with {}", response.not_shared_with.join(", ")),
            ))
        }
    }

    fn move_to_folder(&self, item: &RemoteItem, folder_title: &str) -> Result<(), PortalError> {
        let folder_id = if folder_title == ROOT_FOLDER {
            ROOT_FOLDER.to_string()
        } else {
            self.folder_id(folder_title)?
                .ok_or_else(|| PortalError::Unknown {
                    kind: "folder".to_string(),
                    name: folder_title.to_string(),
                })?
        };
        let url = format!("{}/move", self.item_url(item)?);
        self.post_success("move", &url, &[("folder", folder_id.as_str())])?;
        let destination = (folder_title != ROOT_FOLDER).then(|| folder_title.to_string());
        self.moved
            .borrow_mut()
            .insert(item.item_id.clone(), destination);
        Ok(())
    }

    fn protect(&self, item: &RemoteItem) -> Result<(), PortalError> {
        let url = format!("{}/protect", self.item_url(item)?);
        self.post_success("protect", &url, &[])
    }

    /// Re-reads the service's capabilities and adds `Extract` to them.
    fn enable_downloads(&self, item: &RemoteItem) -> Result<(), PortalError> {
        let operation = "updateDefinition";
        let service_url = item
            .service_url
            .as_deref()
            .ok_or_else(|| PortalError::rejected(operation, "item has no service url"))?;
        let admin = admin_url(service_url)
            .ok_or_else(|| PortalError::rejected(operation, "not a hosted feature service"))?;

        let mut capabilities = self.service_capabilities(service_url)?;
        if capabilities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(EXTRACT_CAPABILITY))
        {
            return Ok(());
        }
        capabilities.push(EXTRACT_CAPABILITY.to_string());
        let definition = serde_json::json!({ "capabilities": capabilities.join(",") }).to_string();

        let url = format!("{}/updateDefinition", admin.trim_end_matches('/'));
        self.post_success(
            operation,
            &url,
            &[("updateDefinition", definition.as_str()), ("async", "false")],
        )
    }
}
