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

use storekit_core::{Error, Result};

/// Storage service a resource lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Blob service: containers and blobs.
    Blob,
    /// Queue service.
    Queue,
    /// Table service.
    Table,
    /// File service: shares and files.
    File,
}

impl Service {
    /// Name used in endpoints and canonicalized resources.
    pub fn endpoint_name(&self) -> &'static str {
        match self {
            Service::Blob => "blob",
            Service::Queue => "queue",
            Service::Table => "table",
            Service::File => "file",
        }
    }
}

/// Kind of a storage resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Blob container.
    Container,
    /// Blob inside a container.
    Blob,
    /// Queue.
    Queue,
    /// Table.
    Table,
    /// File share.
    Share,
    /// File inside a share.
    File,
}

impl ResourceKind {
    /// The service hosting this kind of resource.
    pub fn service(&self) -> Service {
        match self {
            ResourceKind::Container | ResourceKind::Blob => Service::Blob,
            ResourceKind::Queue => Service::Queue,
            ResourceKind::Table => Service::Table,
            ResourceKind::Share | ResourceKind::File => Service::File,
        }
    }

    /// Permission letters valid for this kind, in canonical signing order.
    pub fn permission_alphabet(&self) -> &'static str {
        match self {
            ResourceKind::Container | ResourceKind::Blob => "racwdl",
            ResourceKind::Queue => "raup",
            ResourceKind::Table => "raud",
            ResourceKind::Share | ResourceKind::File => "rcwdl",
        }
    }

    /// Check whether resources of this kind hold a named policy table.
    pub fn owns_policies(&self) -> bool {
        matches!(
            self,
            ResourceKind::Container | ResourceKind::Queue | ResourceKind::Table | ResourceKind::Share
        )
    }

    /// Value of the `sr` signed resource field, `None` for services that don't use it.
    pub fn signed_resource(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Container => Some("c"),
            ResourceKind::Blob => Some("b"),
            ResourceKind::Share => Some("s"),
            ResourceKind::File => Some("f"),
            ResourceKind::Queue | ResourceKind::Table => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Container => "container",
            ResourceKind::Blob => "blob",
            ResourceKind::Queue => "queue",
            ResourceKind::Table => "table",
            ResourceKind::Share => "share",
            ResourceKind::File => "file",
        };
        f.write_str(name)
    }
}

/// Reference to one storage resource within an account.
///
/// Top-level resources (containers, queues, tables, shares) have no `path`.
/// Blobs and files carry the path of the item inside their container or share.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    kind: ResourceKind,
    name: String,
    path: Option<String>,
}

impl ResourceRef {
    /// Reference a blob container.
    pub fn container(name: impl Into<String>) -> Self {
        Self::top_level(ResourceKind::Container, name)
    }

    /// Reference a queue.
    pub fn queue(name: impl Into<String>) -> Self {
        Self::top_level(ResourceKind::Queue, name)
    }

    /// Reference a table.
    pub fn table(name: impl Into<String>) -> Self {
        Self::top_level(ResourceKind::Table, name)
    }

    /// Reference a file share.
    pub fn share(name: impl Into<String>) -> Self {
        Self::top_level(ResourceKind::Share, name)
    }

    /// Reference a blob inside `container`.
    pub fn blob(container: impl Into<String>, blob: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Blob,
            name: container.into(),
            path: Some(blob.into()),
        }
    }

    /// Reference a file inside `share`.
    pub fn file(share: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::File,
            name: share.into(),
            path: Some(path.into()),
        }
    }

    fn top_level(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            path: None,
        }
    }

    /// Kind of the resource.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Name of the top-level resource (the container or share for blobs and files).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of a blob or file inside its container or share.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The resource holding the named policies that apply to this one.
    ///
    /// Blobs use the policies of their container, files those of their share.
    pub fn policy_owner(&self) -> ResourceRef {
        match self.kind {
            ResourceKind::Blob => Self::container(self.name.clone()),
            ResourceKind::File => Self::share(self.name.clone()),
            _ => self.clone(),
        }
    }

    /// Check the reference can be addressed at all.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::unexpected(format!("{} name must not be empty", self.kind)));
        }
        if self.path.as_deref().is_some_and(str::is_empty) {
            return Err(Error::unexpected(format!("{} path must not be empty", self.kind)));
        }
        Ok(())
    }

    /// Canonicalized resource used in the service SAS string-to-sign.
    ///
    /// ## Reference
    ///
    /// - [Specify the canonicalized resource](https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas#version-2018-11-09-and-later)
    pub fn canonicalized(&self, account_name: &str) -> String {
        let service = self.kind.service().endpoint_name();
        let name = match self.kind {
            // Table names are case-insensitive and signed in lower case.
            ResourceKind::Table => self.name.to_lowercase(),
            _ => self.name.clone(),
        };
        match &self.path {
            Some(path) => format!("/{service}/{account_name}/{name}/{path}"),
            None => format!("/{service}/{account_name}/{name}"),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} {}/{}", self.kind, self.name, path),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}
