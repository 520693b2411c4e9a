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

//! Synchronous access to a storage account.

use storekit_core::blocking::{BlockingIter, BlockingRuntime};
use storekit_core::{ListingRequest, Result};

use crate::{
    AccessPolicy, Config, ListResources, ListScope, PolicyTransport, PolicyUpdate, ResourceRef,
    SasRequest, ScopedFetch, StorageClient,
};

/// Blocking flavour of [`StorageClient`].
///
/// Runs every operation on a private current-thread runtime, so it must not
/// be used from inside an async context.
#[derive(Debug)]
pub struct BlockingStorageClient<T> {
    client: StorageClient<T>,
    rt: BlockingRuntime,
}

impl<T> BlockingStorageClient<T>
where
    T: ListResources + PolicyTransport + Clone,
{
    /// Create a blocking client for the account described by `config`.
    pub fn new(config: Config, transport: T) -> Result<Self> {
        Ok(Self {
            client: StorageClient::new(config, transport)?,
            rt: BlockingRuntime::new()?,
        })
    }

    /// The async client underneath.
    pub fn client(&self) -> &StorageClient<T> {
        &self.client
    }

    /// Iterate over `scope`, fetching pages as the iterator advances.
    pub fn list(&self, scope: ListScope, req: ListingRequest) -> BlockingIter<'_, ScopedFetch<T>> {
        self.rt.iter(self.client.list(scope, req))
    }

    /// Fetch the named policies of `resource`.
    pub fn get_policies(&self, resource: &ResourceRef) -> Result<Vec<AccessPolicy>> {
        self.rt.block_on(self.client.policies().get(resource))
    }

    /// Replace the whole named policy table of `resource`.
    pub fn replace_all(&self, resource: &ResourceRef, policies: &[AccessPolicy]) -> Result<()> {
        self.rt
            .block_on(self.client.policies().replace_all(resource, policies))
    }

    /// Add a policy to `resource`.
    pub fn create_policy(&self, resource: &ResourceRef, policy: AccessPolicy) -> Result<()> {
        self.rt
            .block_on(self.client.policies().create_policy(resource, policy))
    }

    /// Change fields of the policy `name` on `resource`.
    pub fn update_policy(
        &self,
        resource: &ResourceRef,
        name: &str,
        update: PolicyUpdate,
    ) -> Result<AccessPolicy> {
        self.rt
            .block_on(self.client.policies().update_policy(resource, name, update))
    }

    /// Remove the policy `name` from `resource`.
    pub fn remove_policy(&self, resource: &ResourceRef, name: &str) -> Result<AccessPolicy> {
        self.rt
            .block_on(self.client.policies().remove_policy(resource, name))
    }

    /// Build a signed access token for `resource`.
    pub fn build_signed_access_descriptor(
        &self,
        resource: &ResourceRef,
        req: SasRequest,
    ) -> Result<String> {
        self.rt.block_on(
            self.client
                .policies()
                .build_signed_access_descriptor(resource, req),
        )
    }
}
