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

use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use storekit_azure_storage::blocking::BlockingStorageClient;
use storekit_azure_storage::{ListScope, ResourceKind, ResourceRef, INCLUDE_METADATA};
use storekit_core::{ErrorKind, ListingRequest};
use storekit_transport_memory::MemoryAccount;
use test_case::test_case;
use tokio_util::sync::CancellationToken;

use crate::{client, init_logger, test_config};

fn account_with_containers(n: usize, max_page_size: u32) -> (MemoryAccount, Vec<String>) {
    let account = MemoryAccount::new().with_max_page_size(max_page_size);
    let names: Vec<String> = (0..n).map(|i| format!("container-{i:03}")).collect();
    for name in &names {
        account.create(&ResourceRef::container(name.as_str()));
    }
    (account, names)
}

#[test_case(7, 3, 3; "three pages")]
#[test_case(7, 7, 1; "one page")]
#[test_case(7, 1, 7; "one item per page")]
#[test_case(0, 3, 1; "empty account")]
#[tokio::test]
async fn test_list_containers_completeness(n: usize, max_page_size: u32, pages: usize) {
    let (account, names) = account_with_containers(n, max_page_size);

    let mut lister = client(&account).list_containers(ListingRequest::new());
    let mut listed = Vec::new();
    while let Some(item) = lister.next().await.expect("listing must succeed") {
        assert_eq!(item.kind, ResourceKind::Container);
        listed.push(item.name);
    }

    assert_eq!(listed, names);
    assert_eq!(lister.pages_fetched(), pages);
    assert_eq!(account.list_calls(), pages);
    assert!(lister.is_exhausted());
}

#[tokio::test]
async fn test_page_size_hints() {
    let account = MemoryAccount::new();
    for i in 0..300 {
        account.create(&ResourceRef::queue(format!("queue-{i:03}")));
        account.create(&ResourceRef::table(format!("table{i:03}")));
    }
    let client = client(&account);

    let queues = client.list_queues(ListingRequest::new());
    assert_eq!(queues.request().page_size(), Some(250));
    assert_eq!(queues.collect().await.expect("must list").len(), 300);
    assert_eq!(account.list_calls(), 2);

    let tables = client.list_tables(ListingRequest::new());
    assert_eq!(tables.request().page_size(), None);
    assert_eq!(tables.collect().await.expect("must list").len(), 300);
    assert_eq!(account.list_calls(), 3);

    let explicit = client.list_queues(ListingRequest::new().with_page_size(100));
    assert_eq!(explicit.collect().await.expect("must list").len(), 300);
    assert_eq!(account.list_calls(), 6);
}

#[tokio::test]
async fn test_list_blobs_with_prefix_and_metadata() {
    let account = MemoryAccount::new();
    account.create_with_metadata(&ResourceRef::blob("photos", "2024/a.png"), [("owner", "ana")]);
    account.create(&ResourceRef::blob("photos", "2024/b.png"));
    account.create(&ResourceRef::blob("photos", "2025/c.png"));
    account.create(&ResourceRef::file("docs", "2024/readme.md"));
    let client = client(&account);

    let blobs = client
        .list_blobs(
            "photos",
            ListingRequest::new()
                .with_prefix("2024/")
                .with_include(INCLUDE_METADATA),
        )
        .collect()
        .await
        .expect("must list");
    let names: Vec<_> = blobs.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["2024/a.png", "2024/b.png"]);
    assert_eq!(blobs[0].metadata.get("owner").map(String::as_str), Some("ana"));
    assert!(blobs[1].metadata.is_empty());

    let files = client
        .list_files("docs", ListingRequest::new())
        .collect()
        .await
        .expect("must list");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].kind, ResourceKind::File);

    let shares = client
        .list_shares(ListingRequest::new())
        .collect()
        .await
        .expect("must list");
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].name, "docs");
}

#[tokio::test]
async fn test_list_missing_container_fails() {
    let account = MemoryAccount::new();
    let err = client(&account)
        .list_blobs("missing", ListingRequest::new())
        .collect()
        .await
        .expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::ListingFailed);
    assert_eq!(err.root_kind(), ErrorKind::NotFound);
    assert!(err.cursor().is_none());
}

#[tokio::test]
async fn test_failed_listing_resumes_from_cursor() {
    let account = MemoryAccount::new().with_max_page_size(3);
    let names: Vec<String> = (0..10).map(|i| format!("q{i}")).collect();
    for name in &names {
        account.create(&ResourceRef::queue(name.as_str()));
    }
    let client = client(&account);
    account.fail_list_after(2);

    let mut lister = client.list_queues(ListingRequest::new());
    let mut listed = Vec::new();
    let err = loop {
        match lister.next().await {
            Ok(Some(item)) => listed.push(item.name),
            Ok(None) => panic!("listing must fail"),
            Err(err) => break err,
        }
    };
    assert_eq!(err.kind(), ErrorKind::ListingFailed);
    assert_eq!(err.root_kind(), ErrorKind::Transport);
    assert_eq!(listed.len(), 6);
    // A failed lister is finished.
    assert!(lister.next().await.expect("no error after failure").is_none());

    let cursor = err.cursor().cloned();
    assert_eq!(cursor.as_ref().map(|c| c.as_str()), Some("q6"));
    let rest = client
        .resume(
            ListScope::Account(ResourceKind::Queue),
            ListingRequest::new(),
            cursor,
        )
        .collect()
        .await
        .expect("resume must succeed");
    listed.extend(rest.into_iter().map(|i| i.name));

    assert_eq!(listed, names);
}

#[tokio::test]
async fn test_cancel_between_pages() {
    let (account, _) = account_with_containers(6, 2);
    let token = CancellationToken::new();
    let mut lister = client(&account)
        .list_containers(ListingRequest::new())
        .with_cancellation(token.clone());

    let first = lister.next_page().await.expect("first page").expect("not done");
    assert_eq!(first.len(), 2);
    token.cancel();

    let err = lister.next().await.expect_err("must be cancelled");
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.cursor().map(|c| c.as_str()), Some("container-002"));
    assert_eq!(account.list_calls(), 1);
}

#[tokio::test]
async fn test_list_as_stream() {
    let (account, names) = account_with_containers(5, 2);
    let listed: Vec<String> = client(&account)
        .list_containers(ListingRequest::new())
        .into_stream()
        .map_ok(|item| item.name)
        .try_collect()
        .await
        .expect("must list");
    assert_eq!(listed, names);
}

#[test]
fn test_blocking_listing_is_lazy() {
    init_logger();
    let (account, names) = account_with_containers(5, 2);
    let client =
        BlockingStorageClient::new(test_config(), account.clone()).expect("config must be valid");

    let mut iter = client.list(
        ListScope::Account(ResourceKind::Container),
        ListingRequest::new(),
    );
    let first = iter.next().expect("has item").expect("must list");
    assert_eq!(first.name, names[0]);
    assert_eq!(account.list_calls(), 1);

    let rest: Vec<String> = iter
        .map(|item| item.map(|i| i.name))
        .collect::<Result<_, _>>()
        .expect("must list");
    assert_eq!(rest, names[1..].to_vec());
    assert_eq!(account.list_calls(), 3);
}
