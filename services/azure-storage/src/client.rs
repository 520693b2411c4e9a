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

use log::debug;
use storekit_core::{Cursor, Error, ListingRequest, PagedLister, Result};

use crate::{
    AccessPolicyStore, Config, ListResources, ListScope, PolicyTransport, ResourceKind,
    ResourceRef, ScopedFetch, ServiceSasSigner,
};

/// Lister over one scope of a storage account.
pub type ResourceLister<T> = PagedLister<ScopedFetch<T>>;

/// StorageClient is the entry point for one storage account.
///
/// It binds a transport to the account configuration: listings pick up the
/// configured page size hints, and the policy store signs with the account's
/// shared key.
#[derive(Debug, Clone)]
pub struct StorageClient<T> {
    config: Config,
    transport: T,
    signer: ServiceSasSigner,
}

impl<T> StorageClient<T>
where
    T: ListResources + PolicyTransport + Clone,
{
    /// Create a client for the account described by `config`.
    ///
    /// Fails with `ConfigInvalid` if the account name or key is missing.
    pub fn new(config: Config, transport: T) -> Result<Self> {
        let signer =
            ServiceSasSigner::new(config.credential()?).with_version(config.sas_version());
        Ok(Self {
            config,
            transport,
            signer,
        })
    }

    /// The account configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configured service endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.config.endpoint.as_deref()
    }

    /// Build the URL of `resource` under the configured endpoint.
    ///
    /// Append a token from
    /// [`AccessPolicyStore::build_signed_access_descriptor`] as the query
    /// string to hand out a signed URL.
    pub fn resource_url(&self, resource: &ResourceRef) -> Result<String> {
        let Some(endpoint) = self.endpoint() else {
            return Err(Error::config_invalid("endpoint is required to build urls"));
        };

        let mut url = format!("{}/{}", endpoint.trim_end_matches('/'), resource.name());
        if let Some(path) = resource.path() {
            url.push('/');
            url.push_str(path);
        }
        Ok(url)
    }

    /// The signer used for access tokens.
    pub fn signer(&self) -> &ServiceSasSigner {
        &self.signer
    }

    /// Enumerate `scope`.
    ///
    /// The configured page size hint is applied unless `req` carries its own.
    pub fn list(&self, scope: ListScope, req: ListingRequest) -> ResourceLister<T> {
        self.resume(scope, req, None)
    }

    /// Continue enumerating `scope` from `cursor`.
    pub fn resume(
        &self,
        scope: ListScope,
        mut req: ListingRequest,
        cursor: Option<Cursor>,
    ) -> ResourceLister<T> {
        if req.page_size().is_none() {
            req = req.with_page_size_hint(self.config.page_sizes.for_kind(scope.item_kind()));
        }
        debug!("list {scope:?} with {req:?}");

        PagedLister::resume(ScopedFetch::new(self.transport.clone(), scope), req, cursor)
    }

    /// Enumerate the containers of the account.
    pub fn list_containers(&self, req: ListingRequest) -> ResourceLister<T> {
        self.list(ListScope::Account(ResourceKind::Container), req)
    }

    /// Enumerate the queues of the account.
    pub fn list_queues(&self, req: ListingRequest) -> ResourceLister<T> {
        self.list(ListScope::Account(ResourceKind::Queue), req)
    }

    /// Enumerate the tables of the account.
    pub fn list_tables(&self, req: ListingRequest) -> ResourceLister<T> {
        self.list(ListScope::Account(ResourceKind::Table), req)
    }

    /// Enumerate the file shares of the account.
    pub fn list_shares(&self, req: ListingRequest) -> ResourceLister<T> {
        self.list(ListScope::Account(ResourceKind::Share), req)
    }

    /// Enumerate the blobs of `container`.
    pub fn list_blobs(&self, container: &str, req: ListingRequest) -> ResourceLister<T> {
        self.list(ListScope::Container(container.to_string()), req)
    }

    /// Enumerate the files of `share`.
    pub fn list_files(&self, share: &str, req: ListingRequest) -> ResourceLister<T> {
        self.list(ListScope::Share(share.to_string()), req)
    }

    /// Policy store bound to this account.
    pub fn policies(&self) -> AccessPolicyStore<T, ServiceSasSigner> {
        AccessPolicyStore::new(self.transport.clone(), self.signer.clone())
    }
}
