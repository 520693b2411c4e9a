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

use std::collections::HashMap;

use storekit_core::{Error, Result};

use crate::constants::{DEVELOPMENT_ACCOUNT_KEY, DEVELOPMENT_ACCOUNT_NAME};
use crate::{Config, Service};

/// Parses an [Azure connection string][1].
///
/// Shared access signatures found in the string are ignored: this crate
/// mints tokens, it never authenticates with one.
///
/// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
pub(crate) fn parse(conn_str: &str, service: Service) -> Result<Config> {
    let key_values = parse_into_key_values(conn_str)?;

    if key_values.get("UseDevelopmentStorage").map(String::as_str) == Some("true") {
        // Azurite has no file service, so only the account is taken from it.
        let account_name = key_values
            .get("AccountName")
            .cloned()
            .unwrap_or_else(|| DEVELOPMENT_ACCOUNT_NAME.to_string());
        let account_key = key_values
            .get("AccountKey")
            .cloned()
            .unwrap_or_else(|| DEVELOPMENT_ACCOUNT_KEY.to_string());
        let endpoint = development_port(service).map(|port| {
            let proxy = key_values
                .get("DevelopmentStorageProxyUri")
                .cloned()
                .unwrap_or_else(|| format!("http://127.0.0.1:{port}"));
            format!("{proxy}/{account_name}")
        });

        return Ok(Config {
            account_name: Some(account_name),
            account_key: Some(account_key),
            endpoint,
            ..Default::default()
        });
    }

    Ok(Config {
        account_name: key_values.get("AccountName").cloned(),
        account_key: key_values.get("AccountKey").cloned(),
        endpoint: collect_endpoint(&key_values, service)?,
        ..Default::default()
    })
}

fn parse_into_key_values(conn_str: &str) -> Result<HashMap<String, String>> {
    conn_str
        .trim()
        .replace('\n', "")
        .split(';')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            let (key, value) = field.split_once('=').ok_or_else(|| {
                Error::config_invalid(format!(
                    "invalid connection string, expected '=' in field: {field}"
                ))
            })?;
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn development_port(service: Service) -> Option<u16> {
    match service {
        Service::Blob => Some(10000),
        Service::Queue => Some(10001),
        Service::Table => Some(10002),
        Service::File => None,
    }
}

fn endpoint_key(service: Service) -> &'static str {
    match service {
        Service::Blob => "BlobEndpoint",
        Service::Queue => "QueueEndpoint",
        Service::Table => "TableEndpoint",
        Service::File => "FileEndpoint",
    }
}

/// Users can still set the endpoint on the config later, so a missing
/// endpoint is not an error.
fn collect_endpoint(
    key_values: &HashMap<String, String>,
    service: Service,
) -> Result<Option<String>> {
    if let Some(endpoint) = key_values.get(endpoint_key(service)) {
        return Ok(Some(endpoint.clone()));
    }

    let (Some(account_name), Some(endpoint_suffix)) = (
        key_values.get("AccountName"),
        key_values.get("EndpointSuffix"),
    ) else {
        return Ok(None);
    };

    let protocol = key_values
        .get("DefaultEndpointsProtocol")
        .map(String::as_str)
        .unwrap_or("https");
    if protocol != "http" && protocol != "https" {
        return Err(Error::config_invalid(format!(
            "invalid DefaultEndpointsProtocol: {protocol}"
        )));
    }

    Ok(Some(format!(
        "{protocol}://{account_name}.{}.{endpoint_suffix}",
        service.endpoint_name()
    )))
}
