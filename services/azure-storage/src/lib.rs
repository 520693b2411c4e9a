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

//! Azure Storage resource listing and access policies
//!
//! This crate provides:
//! - Paged enumeration of containers, queues, tables, shares, blobs and files
//! - Management of the named stored access policies of a resource
//! - Service SAS tokens, either ad hoc or referencing a stored policy
//!
//! The wire protocol is behind the [`ListResources`] and [`PolicyTransport`]
//! traits.
//!
//! # Example
//!
//! ```rust,no_run
//! use storekit_azure_storage::{
//!     AccessPolicy, Config, ListResources, Permissions, PolicyTransport, ResourceKind,
//!     ResourceRef, SasRequest, StorageClient,
//! };
//! use storekit_core::{Context, ListingRequest, Result};
//!
//! async fn example<T: ListResources + PolicyTransport + Clone>(transport: T) -> Result<()> {
//!     let config = Config::default().from_env(&Context::new())?;
//!     let client = StorageClient::new(config, transport)?;
//!
//!     // Enumerate every container whose name starts with `logs-`.
//!     let mut containers = client.list_containers(ListingRequest::new().with_prefix("logs-"));
//!     while let Some(item) = containers.next().await? {
//!         println!("{}", item.name);
//!     }
//!
//!     // Store a read-only policy on a queue and hand out a token bound to it.
//!     let queue = ResourceRef::queue("jobs");
//!     let now = storekit_core::time::now();
//!     let policy = AccessPolicy::new("readers", Permissions::parse(ResourceKind::Queue, "r")?)
//!         .with_start(now)
//!         .with_expiry(now + chrono::TimeDelta::days(7));
//!     client.policies().create_policy(&queue, policy).await?;
//!     let token = client
//!         .policies()
//!         .build_signed_access_descriptor(&queue, SasRequest::with_policy("readers"))
//!         .await?;
//!     println!("?{token}");
//!
//!     Ok(())
//! }
//! ```

pub mod constants;

mod connection_string;

mod config;
pub use config::Config;
pub use config::PageSizes;

mod credential;
pub use credential::Credential;

mod resource;
pub use resource::ResourceKind;
pub use resource::ResourceRef;
pub use resource::Service;

mod permission;
pub use permission::Permission;
pub use permission::Permissions;

pub mod policy;
pub use policy::AccessPolicy;
pub use policy::AccessState;
pub use policy::PolicyUpdate;

mod sas;
pub use sas::IpRange;
pub use sas::Protocol;
pub use sas::SasRequest;
pub use sas::Sign;
pub use sas::SignedAccessDescriptor;

mod service_sas;
pub use service_sas::ServiceSasSigner;

mod store;
pub use store::AccessPolicyStore;
pub use store::PolicyTransport;

mod listing;
pub use listing::ListResources;
pub use listing::ListScope;
pub use listing::ResourceItem;
pub use listing::ScopedFetch;
pub use listing::INCLUDE_METADATA;

mod client;
pub use client::ResourceLister;
pub use client::StorageClient;

pub mod blocking;
