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

use std::collections::HashSet;

use storekit_core::time::{is_strictly_before, truncate_to_second, DateTime};
use storekit_core::{Error, Result};

use crate::constants::{MAX_POLICIES_PER_RESOURCE, MAX_POLICY_NAME_LEN};
use crate::{Permissions, ResourceKind};

/// A named, server-stored access policy on a resource.
///
/// Also known as a stored access policy or signed identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Name of the policy, unique within the resource and case-sensitive.
    pub name: String,
    /// When the policy becomes effective, `None` for immediately.
    pub start: Option<DateTime>,
    /// When the policy stops granting access, `None` for never.
    pub expiry: Option<DateTime>,
    /// Permissions granted by the policy.
    pub permissions: Permissions,
}

/// Effective-access state of a policy at a given instant.
///
/// Derived from the policy window, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// The policy is not effective yet.
    Pending,
    /// The policy grants access.
    Active,
    /// The policy no longer grants access.
    Expired,
}

impl AccessPolicy {
    /// Create a policy without time bounds.
    pub fn new(name: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            name: name.into(),
            start: None,
            expiry: None,
            permissions,
        }
    }

    /// Set when the policy becomes effective.
    pub fn with_start(mut self, start: DateTime) -> Self {
        self.start = Some(start);
        self
    }

    /// Set when the policy stops granting access.
    pub fn with_expiry(mut self, expiry: DateTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Validate name and window of this policy.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_window(self.start, self.expiry)
    }

    /// The effective-access state at `now`.
    pub fn state_at(&self, now: DateTime) -> AccessState {
        let now = truncate_to_second(now);
        if self.start.is_some_and(|start| now < truncate_to_second(start)) {
            AccessState::Pending
        } else if self.expiry.is_some_and(|expiry| now >= truncate_to_second(expiry)) {
            AccessState::Expired
        } else {
            AccessState::Active
        }
    }

    /// Check that both policies carry the same values at second granularity.
    pub fn same_as(&self, other: &AccessPolicy) -> bool {
        self.name == other.name
            && self.permissions == other.permissions
            && self.start.map(truncate_to_second) == other.start.map(truncate_to_second)
            && self.expiry.map(truncate_to_second) == other.expiry.map(truncate_to_second)
    }
}

/// Fields to change on an existing policy.
///
/// `None` leaves a field untouched. `Some(None)` clears an optional bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyUpdate {
    /// New start time.
    pub start: Option<Option<DateTime>>,
    /// New expiry time.
    pub expiry: Option<Option<DateTime>>,
    /// New permissions.
    pub permissions: Option<Permissions>,
}

impl PolicyUpdate {
    /// Apply this update onto `policy`.
    pub fn apply_to(&self, policy: &mut AccessPolicy) {
        if let Some(start) = self.start {
            policy.start = start;
        }
        if let Some(expiry) = self.expiry {
            policy.expiry = expiry;
        }
        if let Some(permissions) = self.permissions {
            policy.permissions = permissions;
        }
    }
}

/// Check a policy name is between 1 and 64 characters.
///
/// Character-set rules are left to the service.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_policy_name("policy name must not be empty"));
    }
    let len = name.chars().count();
    if len > MAX_POLICY_NAME_LEN {
        return Err(Error::invalid_policy_name(format!(
            "policy name has {len} characters, at most {MAX_POLICY_NAME_LEN} are allowed"
        )));
    }
    Ok(())
}

/// Check `expiry` is strictly after `start` when both are present.
pub fn validate_window(start: Option<DateTime>, expiry: Option<DateTime>) -> Result<()> {
    match (start, expiry) {
        (Some(start), Some(expiry)) if !is_strictly_before(start, expiry) => {
            Err(Error::invalid_policy_window(format!(
                "expiry {expiry} must be later than start {start}"
            )))
        }
        _ => Ok(()),
    }
}

/// Validate a complete policy table before it is pushed to `kind`'s resource.
///
/// Checks the table size, then every policy, then name uniqueness.
pub fn validate_policy_set(kind: ResourceKind, policies: &[AccessPolicy]) -> Result<()> {
    if policies.len() > MAX_POLICIES_PER_RESOURCE {
        return Err(Error::too_many_policies(format!(
            "{} policies given, a {kind} holds at most {MAX_POLICIES_PER_RESOURCE}",
            policies.len()
        )));
    }

    let mut names = HashSet::with_capacity(policies.len());
    for policy in policies {
        policy.validate()?;
        if !policy.permissions.is_compatible_with(kind) {
            return Err(Error::invalid_permissions(format!(
                "policy `{}` uses {} permissions on a {kind}",
                policy.name,
                policy.permissions.kind()
            )));
        }
        if !names.insert(policy.name.as_str()) {
            return Err(Error::invalid_policy_name(format!(
                "policy name `{}` is used more than once",
                policy.name
            )));
        }
    }
    Ok(())
}
