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

use std::fmt;
use std::fmt::Debug;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use storekit_core::time::DateTime;
use storekit_core::{Error, Result};

use crate::{Permissions, ResourceRef};

/// Specifies the protocol permitted for a request made with the SAS.
///
/// - [Specify the HTTP protocol](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#specify-the-http-protocol)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// Only requests over HTTPS are accepted.
    Https,
    /// Requests over HTTPS or HTTP are accepted.
    HttpsOrHttp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Protocol::Https => write!(f, "https"),
            Protocol::HttpsOrHttp => write!(f, "https,http"),
        }
    }
}

/// Inclusive range of client addresses a signature is accepted from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IpRange {
    start: IpAddr,
    end: Option<IpAddr>,
}

impl IpRange {
    /// Accept a single address.
    pub fn single(addr: IpAddr) -> Self {
        Self {
            start: addr,
            end: None,
        }
    }

    /// Accept every address from `start` to `end`, both included.
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self> {
        if start.is_ipv4() != end.is_ipv4() {
            return Err(Error::invalid_ip_range(format!(
                "ip range {start}-{end} mixes address families"
            )));
        }
        if end < start {
            return Err(Error::invalid_ip_range(format!(
                "ip range end {end} is lower than start {start}"
            )));
        }
        Ok(Self {
            start,
            end: (start != end).then_some(end),
        })
    }

    /// Check whether `addr` falls inside the range.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match self.end {
            None => addr == self.start,
            Some(end) => addr.is_ipv4() == self.start.is_ipv4() && self.start <= addr && addr <= end,
        }
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            None => write!(f, "{}", self.start),
            Some(end) => write!(f, "{}-{}", self.start, end),
        }
    }
}

impl FromStr for IpRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |v: &str| {
            v.trim().parse::<IpAddr>().map_err(|e| {
                Error::invalid_ip_range(format!("invalid ip address '{v}' in range")).with_source(e)
            })
        };
        match s.split_once('-') {
            Some((start, end)) => Self::new(parse(start)?, parse(end)?),
            None => Ok(Self::single(parse(s)?)),
        }
    }
}

/// An access grant on one resource, ready to be signed.
///
/// Either ad hoc, carrying its own permissions and window, or referencing a
/// stored policy by name. Fields given alongside a policy reference are passed
/// to the signer as they are; the service decides how they combine with the
/// policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAccessDescriptor {
    /// Resource the grant applies to.
    pub resource: ResourceRef,
    /// Name of the stored policy this grant references.
    pub policy: Option<String>,
    /// Permissions granted.
    pub permissions: Option<Permissions>,
    /// When the grant becomes valid.
    pub start: Option<DateTime>,
    /// When the grant expires.
    pub expiry: Option<DateTime>,
    /// Protocol restriction.
    pub protocol: Option<Protocol>,
    /// Client address restriction.
    pub ip_range: Option<IpRange>,
}

/// Sign is the trait used to materialize a descriptor into a token.
///
/// The token is a query string such as `sv=...&sp=r&sig=...`, without the
/// leading `?`.
#[async_trait]
pub trait Sign: Debug + Send + Sync + 'static {
    /// Sign the descriptor.
    async fn sign(&self, descriptor: &SignedAccessDescriptor) -> Result<String>;
}

#[async_trait]
impl<T: Sign + ?Sized> Sign for Arc<T> {
    async fn sign(&self, descriptor: &SignedAccessDescriptor) -> Result<String> {
        self.as_ref().sign(descriptor).await
    }
}

/// Parameters for building a signed access token.
///
/// ```
/// use storekit_azure_storage::{Permissions, Protocol, ResourceKind, SasRequest};
/// # fn example() -> storekit_core::Result<()> {
/// // Ad hoc grant.
/// let adhoc = SasRequest::new()
///     .with_permissions(Permissions::parse(ResourceKind::Queue, "rp")?)
///     .with_protocol(Protocol::Https);
///
/// // Grant referencing the stored policy `readers`.
/// let by_policy = SasRequest::with_policy("readers");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SasRequest {
    /// Name of the stored policy to reference.
    pub policy: Option<String>,
    /// Permissions to grant.
    pub permissions: Option<Permissions>,
    /// Start of the grant.
    pub start: Option<DateTime>,
    /// Expiry of the grant.
    pub expiry: Option<DateTime>,
    /// Protocol restriction.
    pub protocol: Option<Protocol>,
    /// Client address restriction.
    pub ip_range: Option<IpRange>,
}

impl SasRequest {
    /// Create an ad hoc request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request referencing a stored policy.
    pub fn with_policy(name: impl Into<String>) -> Self {
        Self {
            policy: Some(name.into()),
            ..Default::default()
        }
    }

    /// Set the permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Set the start time.
    pub fn with_start(mut self, start: DateTime) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the expiry time.
    pub fn with_expiry(mut self, expiry: DateTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Restrict the protocol.
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Restrict the client addresses.
    pub fn with_ip_range(mut self, ip_range: IpRange) -> Self {
        self.ip_range = Some(ip_range);
        self
    }

    pub(crate) fn into_descriptor(self, resource: ResourceRef) -> SignedAccessDescriptor {
        SignedAccessDescriptor {
            resource,
            policy: self.policy,
            permissions: self.permissions,
            start: self.start,
            expiry: self.expiry,
            protocol: self.protocol,
            ip_range: self.ip_range,
        }
    }
}
