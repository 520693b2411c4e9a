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
use storekit_core::utils::Redact;
use storekit_core::{Context, Error, Result};

use crate::constants::*;
use crate::{connection_string, Credential, ResourceKind, Service};

/// Per-kind page size hints sent with listings.
///
/// `None` leaves the page size to the service default. A hint is an upper
/// bound the service may lower, never a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    /// Hint for container listings.
    pub containers: Option<u32>,
    /// Hint for queue listings.
    pub queues: Option<u32>,
    /// Hint for table listings.
    pub tables: Option<u32>,
    /// Hint for share listings.
    pub shares: Option<u32>,
    /// Hint for blob listings.
    pub blobs: Option<u32>,
    /// Hint for file listings.
    pub files: Option<u32>,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            containers: Some(DEFAULT_LIST_PAGE_SIZE),
            queues: Some(DEFAULT_LIST_PAGE_SIZE),
            tables: None,
            shares: None,
            blobs: None,
            files: None,
        }
    }
}

impl PageSizes {
    /// Use the same hint for every kind.
    pub fn uniform(page_size: u32) -> Self {
        Self {
            containers: Some(page_size),
            queues: Some(page_size),
            tables: Some(page_size),
            shares: Some(page_size),
            blobs: Some(page_size),
            files: Some(page_size),
        }
    }

    /// Hint used when listing resources of `kind`.
    pub fn for_kind(&self, kind: ResourceKind) -> Option<u32> {
        match kind {
            ResourceKind::Container => self.containers,
            ResourceKind::Queue => self.queues,
            ResourceKind::Table => self.tables,
            ResourceKind::Share => self.shares,
            ResourceKind::Blob => self.blobs,
            ResourceKind::File => self.files,
        }
    }
}

/// Config carries all the configuration for a storage account.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_ACCOUNT_NAME`], then `AZBLOB_ACCOUNT_NAME`
    /// - connection string: `AccountName`
    pub account_name: Option<String>,
    /// `account_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_ACCOUNT_KEY`], then `AZBLOB_ACCOUNT_KEY`
    /// - connection string: `AccountKey`
    pub account_key: Option<String>,
    /// `endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AZURE_STORAGE_ENDPOINT`]
    /// - connection string: `BlobEndpoint`, or built from `AccountName` and `EndpointSuffix`
    ///
    /// Used by [`StorageClient::resource_url`](crate::StorageClient::resource_url)
    /// to address resources. Transports bring their own connection settings.
    pub endpoint: Option<String>,
    /// Service version used to sign access tokens.
    ///
    /// Defaults to `2018-11-09` when unset.
    pub sas_version: Option<String>,
    /// Page size hints for listings.
    ///
    /// Env value [`AZURE_STORAGE_LIST_PAGE_SIZE`] overrides every hint.
    pub page_sizes: PageSizes,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .field("endpoint", &self.endpoint)
            .field("sas_version", &self.sas_version)
            .field("page_sizes", &self.page_sizes)
            .finish()
    }
}

impl Config {
    /// Load config from env.
    ///
    /// Fields already set on `self` are kept. Individual variables take
    /// precedence over a connection string found in
    /// [`AZURE_STORAGE_CONNECTION_STRING`], which only fills what is left.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        let envs = ctx.env_vars();

        if self.account_name.is_none() {
            self.account_name = envs
                .get(AZURE_STORAGE_ACCOUNT_NAME)
                .or_else(|| envs.get(AZBLOB_ACCOUNT_NAME))
                .cloned();
        }

        if self.account_key.is_none() {
            self.account_key = envs
                .get(AZURE_STORAGE_ACCOUNT_KEY)
                .or_else(|| envs.get(AZBLOB_ACCOUNT_KEY))
                .cloned();
        }

        if self.endpoint.is_none() {
            self.endpoint = envs.get(AZURE_STORAGE_ENDPOINT).cloned();
        }

        if let Some(v) = envs.get(AZURE_STORAGE_CONNECTION_STRING) {
            let parsed = connection_string::parse(v, Service::Blob)?;
            self.account_name = self.account_name.or(parsed.account_name);
            self.account_key = self.account_key.or(parsed.account_key);
            self.endpoint = self.endpoint.or(parsed.endpoint);
        }

        if let Some(v) = envs.get(AZURE_STORAGE_LIST_PAGE_SIZE) {
            let page_size = v.trim().parse::<u32>().ok().filter(|v| *v > 0).ok_or_else(|| {
                Error::config_invalid(format!(
                    "{AZURE_STORAGE_LIST_PAGE_SIZE} must be a positive integer, got `{v}`"
                ))
            })?;
            debug!("list page size overridden to {page_size} by env");
            self.page_sizes = PageSizes::uniform(page_size);
        }

        Ok(self)
    }

    /// Parses an [Azure connection string][1] into a configuration object,
    /// reading the blob endpoint.
    ///
    /// An example of a connection string looks like:
    ///
    /// ```txt
    /// AccountName=mystorageaccount;
    /// AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;
    /// BlobEndpoint=https://mystorageaccount.blob.core.windows.net
    /// ```
    ///
    /// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        connection_string::parse(conn_str, Service::Blob)
    }

    /// Same as [`Config::from_connection_string`] but reads the endpoint of
    /// `service`.
    pub fn try_from_connection_string(conn_str: &str, service: Service) -> Result<Self> {
        connection_string::parse(conn_str, service)
    }

    /// Build the shared key credential.
    pub fn credential(&self) -> Result<Credential> {
        let Some(account_name) = self.account_name.as_deref().filter(|v| !v.is_empty()) else {
            return Err(Error::config_invalid("account_name is not configured"));
        };
        let Some(account_key) = self.account_key.as_deref().filter(|v| !v.is_empty()) else {
            return Err(Error::config_invalid("account_key is not configured"));
        };
        Ok(Credential::with_shared_key(account_name, account_key))
    }

    /// Service version used to sign access tokens.
    pub fn sas_version(&self) -> &str {
        self.sas_version.as_deref().unwrap_or(SERVICE_SAS_VERSION)
    }
}
