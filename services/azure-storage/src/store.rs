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

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use storekit_core::{Error, Result};

use crate::policy::{validate_policy_set, validate_window};
use crate::{AccessPolicy, PolicyUpdate, ResourceRef, SasRequest, Sign};

/// PolicyTransport is the trait used to read and write the named policy table
/// of a resource on the service.
///
/// The table is always written as a whole: there is no partial update and no
/// concurrency token, so concurrent writers race and the last write wins.
#[async_trait]
pub trait PolicyTransport: Debug + Send + Sync + 'static {
    /// Fetch the named policies of `resource`.
    ///
    /// Returns an empty list when the resource has no policies, and a
    /// `NotFound` error when the resource itself does not exist.
    async fn get_policies(&self, resource: &ResourceRef) -> Result<Vec<AccessPolicy>>;

    /// Replace the named policies of `resource` with `policies`.
    async fn set_policies(&self, resource: &ResourceRef, policies: &[AccessPolicy]) -> Result<()>;
}

#[async_trait]
impl<T: PolicyTransport + ?Sized> PolicyTransport for Arc<T> {
    async fn get_policies(&self, resource: &ResourceRef) -> Result<Vec<AccessPolicy>> {
        self.as_ref().get_policies(resource).await
    }

    async fn set_policies(&self, resource: &ResourceRef, policies: &[AccessPolicy]) -> Result<()> {
        self.as_ref().set_policies(resource, policies).await
    }
}

/// AccessPolicyStore manages the named policy table of resources and turns
/// access grants into signed tokens.
///
/// Every check that can be made locally happens before any call to the
/// transport, so a rejected change never reaches the service and the stored
/// table stays as it was. Rules that only the service knows (for example the
/// allowed characters in a policy name) come back as `Transport` errors.
///
/// Blobs and files are served by the policy table of their container or share.
#[derive(Debug, Clone)]
pub struct AccessPolicyStore<T, S> {
    transport: T,
    signer: S,
}

impl<T: PolicyTransport, S: Sign> AccessPolicyStore<T, S> {
    /// Create a new store.
    pub fn new(transport: T, signer: S) -> Self {
        Self { transport, signer }
    }

    /// Fetch the current named policies of `resource`.
    pub async fn get(&self, resource: &ResourceRef) -> Result<Vec<AccessPolicy>> {
        let owner = resource.policy_owner();
        owner.validate()?;
        self.transport.get_policies(&owner).await
    }

    /// Replace the whole named policy table of `resource`.
    ///
    /// Fails with `TooManyPolicies`, `InvalidPolicyName`, `InvalidPolicyWindow`
    /// or `InvalidPermissions` without contacting the service.
    pub async fn replace_all(&self, resource: &ResourceRef, policies: &[AccessPolicy]) -> Result<()> {
        let owner = resource.policy_owner();
        owner.validate()?;
        validate_policy_set(owner.kind(), policies)?;

        debug!("replace {} policies on {}", policies.len(), owner);
        self.transport.set_policies(&owner, policies).await
    }

    /// Add `policy` to the table of `resource`.
    ///
    /// Read-modify-write: a concurrent writer may overwrite the result.
    pub async fn create_policy(&self, resource: &ResourceRef, policy: AccessPolicy) -> Result<()> {
        policy.validate()?;

        let mut policies = self.get(resource).await?;
        if policies.iter().any(|p| p.name == policy.name) {
            return Err(Error::invalid_policy_name(format!(
                "policy `{}` already exists on {}",
                policy.name,
                resource.policy_owner()
            )));
        }
        policies.push(policy);
        self.replace_all(resource, &policies).await
    }

    /// Change fields of the existing policy `name` on `resource`.
    ///
    /// Read-modify-write: a concurrent writer may overwrite the result.
    pub async fn update_policy(
        &self,
        resource: &ResourceRef,
        name: &str,
        update: PolicyUpdate,
    ) -> Result<AccessPolicy> {
        let mut policies = self.get(resource).await?;
        let Some(policy) = policies.iter_mut().find(|p| p.name == name) else {
            return Err(Error::policy_not_found(format!(
                "policy `{name}` does not exist on {}",
                resource.policy_owner()
            )));
        };
        update.apply_to(policy);
        let updated = policy.clone();

        self.replace_all(resource, &policies).await?;
        Ok(updated)
    }

    /// Remove the policy `name` from `resource`, revoking every token that references it.
    ///
    /// Read-modify-write: a concurrent writer may overwrite the result.
    pub async fn remove_policy(&self, resource: &ResourceRef, name: &str) -> Result<AccessPolicy> {
        let mut policies = self.get(resource).await?;
        let Some(idx) = policies.iter().position(|p| p.name == name) else {
            return Err(Error::policy_not_found(format!(
                "policy `{name}` does not exist on {}",
                resource.policy_owner()
            )));
        };
        let removed = policies.remove(idx);

        self.replace_all(resource, &policies).await?;
        Ok(removed)
    }

    /// Build a signed access token for `resource`.
    ///
    /// - With a policy reference, the policy must currently exist on the
    ///   resource (or its container/share), else `PolicyNotFound`. Explicit
    ///   fields are passed through to the signer untouched.
    /// - Without one, permissions must be given and non-empty, and the window
    ///   must be valid, else `InvalidPolicyWindow`.
    pub async fn build_signed_access_descriptor(
        &self,
        resource: &ResourceRef,
        req: SasRequest,
    ) -> Result<String> {
        resource.validate()?;

        match &req.policy {
            Some(name) => {
                let policies = self.get(resource).await?;
                if !policies.iter().any(|p| &p.name == name) {
                    return Err(Error::policy_not_found(format!(
                        "policy `{name}` does not exist on {}",
                        resource.policy_owner()
                    )));
                }
            }
            None => {
                if req.permissions.map_or(true, |p| p.is_empty()) {
                    return Err(Error::invalid_policy_window(
                        "an ad hoc grant needs at least one permission",
                    ));
                }
                validate_window(req.start, req.expiry)?;
            }
        }

        let descriptor = req.into_descriptor(resource.clone());
        self.signer.sign(&descriptor).await
    }
}
