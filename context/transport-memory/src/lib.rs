// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! In-memory storage account for storekit.
//!
//! `MemoryAccount` implements both [`ListResources`] and [`PolicyTransport`]
//! against a process-local account, so listings and policy tables can be
//! exercised without a service.
//!
//! It behaves the way the service does where it matters to callers:
//!
//! - Listings are ordered by name and paged with an opaque cursor. The page
//!   size hint is capped by a server maximum.
//! - Policy tables are replaced as a whole and stored at second granularity.
//! - Rules the service enforces on its own (policy count and name length) are
//!   rejected as `Transport` errors even when callers skip local checks.
//!
//! Requests whose cancellation token has fired are refused without being
//! counted as served.
//!
//! Failures can be injected with [`MemoryAccount::fail_list_after`] and
//! [`MemoryAccount::fail_next_set_policies`].
//!
//! ## Example
//!
//! ```
//! use storekit_azure_storage::{Config, ResourceRef, StorageClient};
//! use storekit_core::ListingRequest;
//! use storekit_transport_memory::MemoryAccount;
//!
//! # async fn example() -> storekit_core::Result<()> {
//! let account = MemoryAccount::new().with_max_page_size(2);
//! for name in ["a", "b", "c"] {
//!     account.create(&ResourceRef::queue(name));
//! }
//!
//! let config = Config {
//!     account_name: Some("acct".to_string()),
//!     account_key: Some("a2V5".to_string()),
//!     ..Default::default()
//! };
//! let client = StorageClient::new(config, account.clone())?;
//! let queues = client.list_queues(ListingRequest::new()).collect().await?;
//! assert_eq!(queues.len(), 3);
//! assert_eq!(account.list_calls(), 2);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::debug;
use storekit_azure_storage::constants::{MAX_POLICIES_PER_RESOURCE, MAX_POLICY_NAME_LEN};
use storekit_azure_storage::{
    AccessPolicy, ListResources, ListScope, PolicyTransport, ResourceItem, ResourceKind,
    ResourceRef, INCLUDE_METADATA,
};
use storekit_core::time::truncate_to_second;
use storekit_core::{CancellationToken, Cursor, Error, ListingRequest, Page, Result};

/// Largest page the service hands out, whatever the hint.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 5000;

/// A storage account held in memory.
///
/// Clones share the same account.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccount {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    resources: BTreeMap<(ResourceKind, String), Resource>,
    max_page_size: Option<u32>,
    list_calls: usize,
    policy_writes: usize,
    fail_list_after: Option<usize>,
    fail_next_set_policies: bool,
}

#[derive(Debug, Default)]
struct Resource {
    metadata: BTreeMap<String, String>,
    policies: Vec<AccessPolicy>,
    // Blobs of a container or files of a share, with their metadata.
    children: BTreeMap<String, BTreeMap<String, String>>,
}

impl MemoryAccount {
    /// Create an empty account.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every page to `max` items.
    pub fn with_max_page_size(self, max: u32) -> Self {
        self.lock().max_page_size = Some(max.max(1));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("lock poisoned")
    }

    /// Create `resource`, and its container or share for blobs and files.
    ///
    /// Creating an existing resource keeps it as it is.
    pub fn create(&self, resource: &ResourceRef) {
        let mut state = self.lock();
        let parent = state
            .resources
            .entry((resource.policy_owner().kind(), resource.name().to_string()))
            .or_default();
        if let Some(path) = resource.path() {
            parent.children.entry(path.to_string()).or_default();
        }
    }

    /// Create `resource` with user metadata.
    pub fn create_with_metadata<'a>(
        &self,
        resource: &ResourceRef,
        metadata: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        self.create(resource);

        let metadata = metadata
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        let mut state = self.lock();
        let Some(parent) = state
            .resources
            .get_mut(&(resource.policy_owner().kind(), resource.name().to_string()))
        else {
            return;
        };
        match resource.path() {
            Some(path) => parent
                .children
                .entry(path.to_string())
                .or_default()
                .extend(metadata),
            None => parent.metadata.extend(metadata),
        }
    }

    /// Delete `resource`. Deleting a container or share drops its content
    /// and its policies.
    pub fn delete(&self, resource: &ResourceRef) {
        let mut state = self.lock();
        let key = (resource.policy_owner().kind(), resource.name().to_string());
        match resource.path() {
            Some(path) => {
                if let Some(parent) = state.resources.get_mut(&key) {
                    parent.children.remove(path);
                }
            }
            None => {
                state.resources.remove(&key);
            }
        }
    }

    /// Let `n` more page requests succeed, then fail the next one.
    ///
    /// The failure happens once; later requests succeed again.
    pub fn fail_list_after(&self, n: usize) {
        self.lock().fail_list_after = Some(n);
    }

    /// Fail the next policy write without changing anything.
    pub fn fail_next_set_policies(&self) {
        self.lock().fail_next_set_policies = true;
    }

    /// Number of page requests served, failed ones included.
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Number of policy tables written.
    pub fn policy_writes(&self) -> usize {
        self.lock().policy_writes
    }
}

impl State {
    fn resource(&self, resource: &ResourceRef) -> Result<&Resource> {
        self.resources
            .get(&(resource.kind(), resource.name().to_string()))
            .ok_or_else(|| Error::not_found(format!("{resource} does not exist")))
    }

    fn resource_mut(&mut self, resource: &ResourceRef) -> Result<&mut Resource> {
        self.resources
            .get_mut(&(resource.kind(), resource.name().to_string()))
            .ok_or_else(|| Error::not_found(format!("{resource} does not exist")))
    }

    fn items(&self, scope: &ListScope) -> Result<Vec<ResourceItem>> {
        let items: Vec<ResourceItem> = match scope {
            ListScope::Account(kind) if kind.owns_policies() => self
                .resources
                .iter()
                .filter(|((k, _), _)| k == kind)
                .map(|((_, name), r)| item(*kind, name, &r.metadata))
                .collect(),
            ListScope::Account(kind) => {
                return Err(Error::unexpected(format!(
                    "{kind} can't be listed at account level"
                )))
            }
            ListScope::Container(name) => self
                .resource(&ResourceRef::container(name.as_str()))?
                .children
                .iter()
                .map(|(path, metadata)| item(ResourceKind::Blob, path, metadata))
                .collect(),
            ListScope::Share(name) => self
                .resource(&ResourceRef::share(name.as_str()))?
                .children
                .iter()
                .map(|(path, metadata)| item(ResourceKind::File, path, metadata))
                .collect(),
        };
        Ok(items)
    }
}

fn item(kind: ResourceKind, name: &str, metadata: &BTreeMap<String, String>) -> ResourceItem {
    ResourceItem {
        kind,
        name: name.to_string(),
        metadata: metadata.clone(),
    }
}

#[async_trait]
impl ListResources for MemoryAccount {
    async fn list_resources(
        &self,
        scope: &ListScope,
        req: &ListingRequest,
        cursor: Option<&Cursor>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Page<ResourceItem>> {
        if cancel.is_some_and(|t| t.is_cancelled()) {
            return Err(Error::cancelled(format!("list {scope:?} cancelled")));
        }

        let mut state = self.lock();
        state.list_calls += 1;

        if let Some(n) = state.fail_list_after {
            if n == 0 {
                state.fail_list_after = None;
                return Err(Error::transport("injected listing failure"));
            }
            state.fail_list_after = Some(n - 1);
        }

        let max = state.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE);
        let page_size = req.page_size().unwrap_or(max).clamp(1, max) as usize;

        // Items are sorted by name, the cursor is the first name of the page.
        let mut matching = state
            .items(scope)?
            .into_iter()
            .filter(|i| cursor.map_or(true, |c| i.name.as_str() >= c.as_str()))
            .filter(|i| req.prefix().map_or(true, |p| i.name.starts_with(p)));

        let mut items: Vec<ResourceItem> = matching.by_ref().take(page_size).collect();
        let next = matching.next().map(|i| i.name);
        if !req.includes(INCLUDE_METADATA) {
            items.iter_mut().for_each(|i| i.metadata.clear());
        }

        debug!(
            "list {scope:?} from {:?}: {} items, next {next:?}",
            cursor.map(Cursor::as_str),
            items.len()
        );
        Ok(Page::new(items, next))
    }
}

#[async_trait]
impl PolicyTransport for MemoryAccount {
    async fn get_policies(&self, resource: &ResourceRef) -> Result<Vec<AccessPolicy>> {
        let state = self.lock();
        Ok(state.resource(resource)?.policies.clone())
    }

    async fn set_policies(&self, resource: &ResourceRef, policies: &[AccessPolicy]) -> Result<()> {
        let mut state = self.lock();

        if std::mem::take(&mut state.fail_next_set_policies) {
            return Err(Error::transport("injected policy write failure"));
        }
        if policies.len() > MAX_POLICIES_PER_RESOURCE {
            return Err(Error::transport(format!(
                "service rejected {} signed identifiers",
                policies.len()
            )));
        }
        if let Some(p) = policies
            .iter()
            .find(|p| p.name.is_empty() || p.name.chars().count() > MAX_POLICY_NAME_LEN)
        {
            return Err(Error::transport(format!(
                "service rejected signed identifier `{}`",
                p.name
            )));
        }

        let stored = policies
            .iter()
            .map(|p| AccessPolicy {
                start: p.start.map(truncate_to_second),
                expiry: p.expiry.map(truncate_to_second),
                ..p.clone()
            })
            .collect();
        state.resource_mut(resource)?.policies = stored;
        state.policy_writes += 1;
        Ok(())
    }
}
