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

use chrono::TimeDelta;
use pretty_assertions::assert_eq;
use storekit_azure_storage::{
    AccessPolicy, AccessState, Permissions, PolicyUpdate, ResourceKind, ResourceRef,
};
use storekit_core::time::{now, truncate_to_second};
use storekit_core::ErrorKind;
use storekit_transport_memory::MemoryAccount;
use test_case::test_case;

use crate::client;

fn read(kind: ResourceKind) -> Permissions {
    Permissions::parse(kind, "r").expect("r is valid everywhere")
}

fn setup(resource: &ResourceRef) -> MemoryAccount {
    let account = MemoryAccount::new();
    account.create(resource);
    account
}

#[tokio::test]
async fn test_round_trip_then_replace() {
    let container = ResourceRef::container("reports");
    let account = setup(&container);
    let store = client(&account).policies();

    let t = now();
    let p1 = AccessPolicy::new("p1", read(ResourceKind::Container))
        .with_start(t - TimeDelta::days(2))
        .with_expiry(t + TimeDelta::days(10));
    store
        .create_policy(&container, p1.clone())
        .await
        .expect("create must succeed");

    let got = store.get(&container).await.expect("get must succeed");
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].name, "p1");
    assert_eq!(got[0].permissions.to_string(), "r");
    assert_eq!(got[0].start, Some(truncate_to_second(t - TimeDelta::days(2))));
    assert_eq!(got[0].expiry, Some(truncate_to_second(t + TimeDelta::days(10))));
    assert!(got[0].same_as(&p1));
    assert_eq!(got[0].state_at(t), AccessState::Active);

    let p2 = AccessPolicy::new("p2", Permissions::parse(ResourceKind::Container, "rl").unwrap())
        .with_expiry(t + TimeDelta::hours(1));
    store
        .replace_all(&container, &[p2.clone()])
        .await
        .expect("replace must succeed");

    let got = store.get(&container).await.expect("get must succeed");
    let names: Vec<_> = got.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["p2"]);
    assert!(got[0].same_as(&p2));
}

#[tokio::test]
async fn test_empty_policy_set() {
    let queue = ResourceRef::queue("jobs");
    let account = setup(&queue);
    let store = client(&account).policies();

    assert!(store.get(&queue).await.expect("get must succeed").is_empty());

    let err = store
        .get(&ResourceRef::queue("missing"))
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_sixth_policy_is_rejected() {
    let table = ResourceRef::table("orders");
    let account = setup(&table);
    let store = client(&account).policies();

    let five: Vec<_> = (1..=5)
        .map(|i| AccessPolicy::new(format!("policy{i}"), read(ResourceKind::Table)))
        .collect();
    store
        .replace_all(&table, &five)
        .await
        .expect("five policies fit");
    assert_eq!(account.policy_writes(), 1);

    let err = store
        .create_policy(&table, AccessPolicy::new("policy6", read(ResourceKind::Table)))
        .await
        .expect_err("sixth policy must fail");
    assert_eq!(err.kind(), ErrorKind::TooManyPolicies);

    let mut six = five.clone();
    six.push(AccessPolicy::new("policy6", read(ResourceKind::Table)));
    let err = store
        .replace_all(&table, &six)
        .await
        .expect_err("six policies must fail");
    assert_eq!(err.kind(), ErrorKind::TooManyPolicies);

    assert_eq!(store.get(&table).await.expect("get must succeed"), five);
    assert_eq!(account.policy_writes(), 1);
}

#[test_case(TimeDelta::minutes(10), TimeDelta::zero(); "expiry before start")]
#[test_case(TimeDelta::zero(), TimeDelta::zero(); "expiry equal to start")]
#[test_case(TimeDelta::milliseconds(100), TimeDelta::milliseconds(900); "same second")]
#[tokio::test]
async fn test_invalid_window_is_rejected(start: TimeDelta, expiry: TimeDelta) {
    let share = ResourceRef::share("docs");
    let account = setup(&share);
    let store = client(&account).policies();

    let t = truncate_to_second(now());
    let policy = AccessPolicy::new("w", read(ResourceKind::Share))
        .with_start(t + start)
        .with_expiry(t + expiry);
    let err = store
        .create_policy(&share, policy)
        .await
        .expect_err("window must be rejected");

    assert_eq!(err.kind(), ErrorKind::InvalidPolicyWindow);
    assert!(err.is_validation_error());
    assert!(store.get(&share).await.expect("get").is_empty());
    assert_eq!(account.policy_writes(), 0);
}

#[test_case(1, true; "one character")]
#[test_case(64, true; "sixty four characters")]
#[test_case(0, false; "empty")]
#[test_case(65, false; "sixty five characters")]
#[tokio::test]
async fn test_policy_name_bounds(len: usize, accepted: bool) {
    let container = ResourceRef::container("names");
    let account = setup(&container);
    let store = client(&account).policies();

    let policy = AccessPolicy::new("n".repeat(len), read(ResourceKind::Container));
    let result = store.replace_all(&container, &[policy]).await;

    if accepted {
        result.expect("name must be accepted");
        assert_eq!(store.get(&container).await.expect("get")[0].name.len(), len);
    } else {
        let err = result.expect_err("name must be rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidPolicyName);
        assert_eq!(account.policy_writes(), 0);
    }
}

#[tokio::test]
async fn test_duplicate_names_are_rejected() {
    let queue = ResourceRef::queue("dupes");
    let account = setup(&queue);
    let store = client(&account).policies();

    let p = AccessPolicy::new("same", read(ResourceKind::Queue));
    let err = store
        .replace_all(&queue, &[p.clone(), p.clone()])
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidPolicyName);

    store.create_policy(&queue, p.clone()).await.expect("create");
    let err = store.create_policy(&queue, p).await.expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidPolicyName);
}

#[tokio::test]
async fn test_foreign_permissions_are_rejected() {
    let queue = ResourceRef::queue("perm");
    let account = setup(&queue);
    let store = client(&account).policies();

    let policy = AccessPolicy::new(
        "list",
        Permissions::parse(ResourceKind::Container, "rl").unwrap(),
    );
    let err = store
        .create_policy(&queue, policy)
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidPermissions);
}

#[tokio::test]
async fn test_update_and_remove_policy() {
    let container = ResourceRef::container("lifecycle");
    let account = setup(&container);
    let store = client(&account).policies();
    let t = truncate_to_second(now());

    store
        .create_policy(
            &container,
            AccessPolicy::new("p", read(ResourceKind::Container)).with_start(t + TimeDelta::hours(1)),
        )
        .await
        .expect("create");
    assert_eq!(
        store.get(&container).await.expect("get")[0].state_at(t),
        AccessState::Pending
    );

    let updated = store
        .update_policy(
            &container,
            "p",
            PolicyUpdate {
                start: Some(None),
                expiry: Some(Some(t - TimeDelta::seconds(1))),
                permissions: Some(Permissions::parse(ResourceKind::Container, "rwl").unwrap()),
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.permissions.to_string(), "rwl");
    assert_eq!(updated.state_at(t), AccessState::Expired);
    assert_eq!(store.get(&container).await.expect("get"), vec![updated.clone()]);

    let err = store
        .update_policy(&container, "q", PolicyUpdate::default())
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);

    let err = store
        .update_policy(
            &container,
            "p",
            PolicyUpdate {
                start: Some(Some(t)),
                ..Default::default()
            },
        )
        .await
        .expect_err("update must keep a valid window");
    assert_eq!(err.kind(), ErrorKind::InvalidPolicyWindow);

    let removed = store.remove_policy(&container, "p").await.expect("remove");
    assert_eq!(removed, updated);
    assert!(store.get(&container).await.expect("get").is_empty());

    let err = store
        .remove_policy(&container, "p")
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
}

#[tokio::test]
async fn test_blob_uses_container_policies() {
    let blob = ResourceRef::blob("media", "clip.mp4");
    let account = setup(&blob);
    let store = client(&account).policies();

    store
        .create_policy(&blob, AccessPolicy::new("viewers", read(ResourceKind::Blob)))
        .await
        .expect("create");

    let on_container = store
        .get(&ResourceRef::container("media"))
        .await
        .expect("get");
    assert_eq!(on_container.len(), 1);
    assert_eq!(on_container[0].name, "viewers");
}

#[tokio::test]
async fn test_failed_write_leaves_policies_unchanged() {
    let queue = ResourceRef::queue("stable");
    let account = setup(&queue);
    let store = client(&account).policies();
    let p1 = AccessPolicy::new("p1", read(ResourceKind::Queue));
    store.create_policy(&queue, p1.clone()).await.expect("create");

    account.fail_next_set_policies();
    let err = store
        .replace_all(&queue, &[AccessPolicy::new("p2", read(ResourceKind::Queue))])
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.is_validation_error());

    assert_eq!(store.get(&queue).await.expect("get"), vec![p1]);
}

#[tokio::test]
async fn test_concurrent_writers_last_write_wins() {
    let queue = ResourceRef::queue("race");
    let account = setup(&queue);
    let alice = client(&account).policies();
    let bob = client(&account).policies();

    // Both read the empty table, then both write their own view of it.
    let mut alice_view = alice.get(&queue).await.expect("get");
    let mut bob_view = bob.get(&queue).await.expect("get");
    alice_view.push(AccessPolicy::new("alice", read(ResourceKind::Queue)));
    bob_view.push(AccessPolicy::new("bob", read(ResourceKind::Queue)));
    alice.replace_all(&queue, &alice_view).await.expect("write");
    bob.replace_all(&queue, &bob_view).await.expect("write");

    let names: Vec<_> = alice
        .get(&queue)
        .await
        .expect("get")
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["bob".to_string()]);
}
