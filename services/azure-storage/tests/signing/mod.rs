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

use chrono::TimeDelta;
use pretty_assertions::assert_eq;
use storekit_azure_storage::blocking::BlockingStorageClient;
use storekit_azure_storage::{
    AccessPolicy, IpRange, Permissions, Protocol, ResourceKind, ResourceRef, SasRequest,
};
use storekit_core::hash::base64_hmac_sha256;
use storekit_core::time::{format_rfc3339, now, truncate_to_second};
use storekit_core::ErrorKind;
use storekit_transport_memory::MemoryAccount;

use crate::{client, init_logger, test_config, ACCOUNT_NAME};

fn query_pairs(token: &str) -> HashMap<String, String> {
    form_urlencoded::parse(token.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[tokio::test]
async fn test_policy_reference_requires_existing_policy() {
    let container = ResourceRef::container("shared");
    let account = MemoryAccount::new();
    account.create(&container);
    let store = client(&account).policies();

    let t = now();
    store
        .create_policy(
            &container,
            AccessPolicy::new("p", Permissions::parse(ResourceKind::Container, "r").unwrap())
                .with_expiry(t + TimeDelta::days(1)),
        )
        .await
        .expect("create");

    let token = store
        .build_signed_access_descriptor(&container, SasRequest::with_policy("p"))
        .await
        .expect("policy exists");
    let pairs = query_pairs(&token);
    assert_eq!(pairs.get("si").map(String::as_str), Some("p"));
    assert_eq!(pairs.get("sr").map(String::as_str), Some("c"));
    assert_eq!(pairs.get("sv").map(String::as_str), Some("2018-11-09"));
    // Permissions and window come from the stored policy.
    assert!(!pairs.contains_key("sp"));
    assert!(!pairs.contains_key("se"));
    assert!(pairs.contains_key("sig"));

    store.remove_policy(&container, "p").await.expect("remove");
    let err = store
        .build_signed_access_descriptor(&container, SasRequest::with_policy("p"))
        .await
        .expect_err("policy was deleted");
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
}

#[tokio::test]
async fn test_policy_reference_on_blob_uses_container_table() {
    let blob = ResourceRef::blob("shared", "dir/report.csv");
    let account = MemoryAccount::new();
    account.create(&blob);
    let store = client(&account).policies();
    store
        .create_policy(
            &blob,
            AccessPolicy::new("readers", Permissions::parse(ResourceKind::Blob, "r").unwrap()),
        )
        .await
        .expect("create");

    let t = truncate_to_second(now());
    let token = store
        .build_signed_access_descriptor(
            &blob,
            SasRequest::with_policy("readers").with_expiry(t + TimeDelta::hours(1)),
        )
        .await
        .expect("sign");
    let pairs = query_pairs(&token);
    assert_eq!(pairs.get("sr").map(String::as_str), Some("b"));
    assert_eq!(pairs.get("si").map(String::as_str), Some("readers"));
    assert_eq!(
        pairs.get("se"),
        Some(&format_rfc3339(t + TimeDelta::hours(1)))
    );
}

#[tokio::test]
async fn test_adhoc_grant_signature() {
    let queue = ResourceRef::queue("jobs");
    let account = MemoryAccount::new();
    let client = client(&account);
    let t = truncate_to_second(now());

    let token = client
        .policies()
        .build_signed_access_descriptor(
            &queue,
            SasRequest::new()
                .with_permissions(Permissions::parse(ResourceKind::Queue, "pr").unwrap())
                .with_start(t)
                .with_expiry(t + TimeDelta::minutes(15))
                .with_protocol(Protocol::Https)
                .with_ip_range("10.1.0.0-10.1.255.255".parse::<IpRange>().unwrap()),
        )
        .await
        .expect("sign");
    let pairs = query_pairs(&token);
    assert_eq!(pairs.get("sp").map(String::as_str), Some("rp"));
    assert_eq!(pairs.get("spr").map(String::as_str), Some("https"));
    assert!(!pairs.contains_key("si"));
    assert!(!pairs.contains_key("sr"));

    let string_to_sign = format!(
        "rp\n{}\n{}\n/queue/{ACCOUNT_NAME}/jobs\n\n10.1.0.0-10.1.255.255\nhttps\n2018-11-09",
        format_rfc3339(t),
        format_rfc3339(t + TimeDelta::minutes(15)),
    );
    assert_eq!(
        pairs.get("sig"),
        Some(&base64_hmac_sha256(
            b"storekit-test-account-key",
            string_to_sign.as_bytes()
        ))
    );
}

#[tokio::test]
async fn test_adhoc_grant_needs_permissions_and_window() {
    let table = ResourceRef::table("Orders");
    let account = MemoryAccount::new();
    let store = client(&account).policies();
    let t = now();

    let cases = vec![
        ("no permissions", SasRequest::new().with_expiry(t + TimeDelta::hours(1))),
        (
            "empty permissions",
            SasRequest::new()
                .with_permissions(Permissions::none(ResourceKind::Table))
                .with_expiry(t + TimeDelta::hours(1)),
        ),
        (
            "expiry before start",
            SasRequest::new()
                .with_permissions(Permissions::all(ResourceKind::Table))
                .with_start(t + TimeDelta::minutes(10))
                .with_expiry(t),
        ),
        (
            "expiry equal to start",
            SasRequest::new()
                .with_permissions(Permissions::all(ResourceKind::Table))
                .with_start(t)
                .with_expiry(t),
        ),
    ];
    for (name, req) in cases {
        let err = store
            .build_signed_access_descriptor(&table, req)
            .await
            .expect_err(name);
        assert_eq!(err.kind(), ErrorKind::InvalidPolicyWindow, "case {name}");
    }

    let token = store
        .build_signed_access_descriptor(
            &table,
            SasRequest::new().with_permissions(Permissions::all(ResourceKind::Table)),
        )
        .await
        .expect("open-ended grant is allowed");
    let pairs = query_pairs(&token);
    assert_eq!(pairs.get("tn").map(String::as_str), Some("Orders"));
    assert_eq!(pairs.get("sp").map(String::as_str), Some("raud"));
}

#[tokio::test]
async fn test_adhoc_grant_rejects_foreign_permissions() {
    let share = ResourceRef::share("docs");
    let account = MemoryAccount::new();
    let store = client(&account).policies();

    let err = store
        .build_signed_access_descriptor(
            &share,
            SasRequest::new().with_permissions(Permissions::parse(ResourceKind::Queue, "p").unwrap()),
        )
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidPermissions);
}

#[test]
fn test_blocking_policy_flow() {
    init_logger();
    let share = ResourceRef::share("archive");
    let account = MemoryAccount::new();
    account.create(&share);
    let client = BlockingStorageClient::new(test_config(), account).expect("config must be valid");

    client
        .create_policy(
            &share,
            AccessPolicy::new("auditors", Permissions::parse(ResourceKind::Share, "rl").unwrap()),
        )
        .expect("create");
    assert_eq!(client.get_policies(&share).expect("get").len(), 1);

    let token = client
        .build_signed_access_descriptor(&share, SasRequest::with_policy("auditors"))
        .expect("sign");
    assert_eq!(query_pairs(&token).get("sr").map(String::as_str), Some("s"));

    client.remove_policy(&share, "auditors").expect("remove");
    let err = client
        .build_signed_access_descriptor(&share, SasRequest::with_policy("auditors"))
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
}
