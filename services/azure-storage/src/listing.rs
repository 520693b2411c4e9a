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

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use storekit_core::{CancellationToken, Cursor, FetchPage, ListingRequest, Page, Result};

use crate::ResourceKind;

/// Include user metadata in a listing.
pub const INCLUDE_METADATA: &str = "metadata";

/// What a listing enumerates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListScope {
    /// Top-level resources of one kind in the account: containers, queues,
    /// tables or shares.
    Account(ResourceKind),
    /// Blobs inside a container.
    Container(String),
    /// Files inside a share.
    Share(String),
}

impl ListScope {
    /// Kind of the items this scope yields.
    pub fn item_kind(&self) -> ResourceKind {
        match self {
            ListScope::Account(kind) => *kind,
            ListScope::Container(_) => ResourceKind::Blob,
            ListScope::Share(_) => ResourceKind::File,
        }
    }
}

/// One entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    /// Kind of the listed resource.
    pub kind: ResourceKind,
    /// Name of the resource, or its path inside the container or share.
    pub name: String,
    /// User metadata, only filled when `metadata` was requested.
    pub metadata: BTreeMap<String, String>,
}

impl ResourceItem {
    /// Create an item without metadata.
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// ListResources is the trait used to fetch one page of any listing from the
/// service.
#[async_trait]
pub trait ListResources: Debug + Send + Sync + 'static {
    /// Fetch the page of `scope` starting at `cursor`.
    ///
    /// Implementations should fail with `Cancelled` once `cancel` fires.
    async fn list_resources(
        &self,
        scope: &ListScope,
        req: &ListingRequest,
        cursor: Option<&Cursor>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Page<ResourceItem>>;
}

#[async_trait]
impl<T: ListResources + ?Sized> ListResources for Arc<T> {
    async fn list_resources(
        &self,
        scope: &ListScope,
        req: &ListingRequest,
        cursor: Option<&Cursor>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Page<ResourceItem>> {
        self.as_ref().list_resources(scope, req, cursor, cancel).await
    }
}

/// Fetches pages of one listing scope through a [`ListResources`] transport.
#[derive(Debug, Clone)]
pub struct ScopedFetch<T> {
    transport: T,
    scope: ListScope,
}

impl<T: ListResources> ScopedFetch<T> {
    /// Bind `transport` to `scope`.
    pub fn new(transport: T, scope: ListScope) -> Self {
        Self { transport, scope }
    }

    /// The scope being listed.
    pub fn scope(&self) -> &ListScope {
        &self.scope
    }
}

#[async_trait]
impl<T: ListResources> FetchPage for ScopedFetch<T> {
    type Item = ResourceItem;

    async fn fetch_page(
        &self,
        req: &ListingRequest,
        cursor: Option<&Cursor>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Page<ResourceItem>> {
        self.transport
            .list_resources(&self.scope, req, cursor, cancel)
            .await
    }
}
