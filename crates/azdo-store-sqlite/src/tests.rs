//! Integration tests for `SqliteKv` against an in-memory database.

use std::time::Duration;

use azdo_core::{
  Store,
  atomic::RetryPolicy,
  kv::KvBackend,
  project::ProjectDetails,
  store::{PROJECT_LIST_KEY, SUBSCRIPTION_LIST_KEY},
  subscription::{EventType, FilterDisplayNames, SubscriptionDetails, SubscriptionFilters},
};

use crate::SqliteKv;

async fn kv() -> SqliteKv {
  SqliteKv::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Raw key-value operations ────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_returns_none() {
  let s = kv().await;
  assert_eq!(s.get("nope").await.unwrap(), None);
}

#[tokio::test]
async fn set_then_get() {
  let s = kv().await;
  s.set("k", b"one").await.unwrap();
  s.set("k", b"two").await.unwrap();
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some(&b"two"[..]));
}

#[tokio::test]
async fn delete_is_idempotent() {
  let s = kv().await;
  s.set("k", b"v").await.unwrap();
  s.delete("k").await.unwrap();
  s.delete("k").await.unwrap();
  assert_eq!(s.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn compare_and_set_expecting_absent() {
  let s = kv().await;
  assert!(s.compare_and_set("k", b"first", None).await.unwrap());
  assert!(!s.compare_and_set("k", b"second", None).await.unwrap());
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some(&b"first"[..]));
}

#[tokio::test]
async fn compare_and_set_expecting_value() {
  let s = kv().await;
  s.set("k", b"one").await.unwrap();

  assert!(!s.compare_and_set("k", b"two", Some(b"other")).await.unwrap());
  assert!(s.compare_and_set("k", b"two", Some(b"one")).await.unwrap());
  // The old expectation is now stale.
  assert!(!s.compare_and_set("k", b"three", Some(b"one")).await.unwrap());
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some(&b"two"[..]));
}

#[tokio::test]
async fn compare_and_set_on_missing_key_with_expectation_fails() {
  let s = kv().await;
  assert!(!s.compare_and_set("k", b"v", Some(b"old")).await.unwrap());
  assert_eq!(s.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn ttl_entries_expire_and_count_as_absent() {
  let s = kv().await;
  s.set_with_ttl("k", b"short", Duration::from_millis(1)).await.unwrap();
  s.set_with_ttl("long", b"v", Duration::from_secs(3600)).await.unwrap();
  tokio::time::sleep(Duration::from_millis(20)).await;

  assert_eq!(s.get("k").await.unwrap(), None);
  assert!(!s.compare_and_set("k", b"x", Some(b"short")).await.unwrap());
  assert!(s.compare_and_set("k", b"fresh", None).await.unwrap());
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some(&b"fresh"[..]));
  assert!(s.get("long").await.unwrap().is_some());
}

#[tokio::test]
async fn purge_expired_removes_only_expired_rows() {
  let s = kv().await;
  s.set_with_ttl("gone", b"v", Duration::from_millis(1)).await.unwrap();
  s.set_with_ttl("kept", b"v", Duration::from_secs(3600)).await.unwrap();
  s.set("plain", b"v").await.unwrap();
  tokio::time::sleep(Duration::from_millis(20)).await;

  assert_eq!(s.purge_expired().await.unwrap(), 1);
  assert_eq!(s.purge_expired().await.unwrap(), 0);
  assert!(s.get("kept").await.unwrap().is_some());
  assert!(s.get("plain").await.unwrap().is_some());
}

// ─── Repositories over SQLite ────────────────────────────────────────────────

fn project(owner: &str, name: &str) -> ProjectDetails {
  ProjectDetails {
    owner_id:          owner.into(),
    organization_name: "contoso".into(),
    project_name:      name.into(),
    project_id:        String::new(),
  }
}

fn subscription(owner: &str, channel: &str) -> SubscriptionDetails {
  SubscriptionDetails {
    owner_id:          owner.into(),
    organization_name: "contoso".into(),
    project_name:      "web".into(),
    channel_id:        channel.into(),
    event_type:        EventType::PullRequestMerged,
    filters:           SubscriptionFilters::default(),
    project_id:        String::new(),
    channel_name:      String::new(),
    channel_type:      "O".into(),
    created_by:        owner.into(),
    filter_names:      FilterDisplayNames::default(),
  }
}

#[tokio::test]
async fn projects_persist_through_sqlite() {
  let s = Store::new(kv().await);
  let web = project("u1", "web");

  s.store_project(&web).await.unwrap();
  s.store_project(&web).await.unwrap();
  s.store_project(&project("u1", "api")).await.unwrap();
  assert_eq!(s.get_all_projects("u1").await.unwrap().len(), 2);

  s.delete_project(&web).await.unwrap();
  assert_eq!(s.get_all_projects("u1").await.unwrap(), vec![project("u1", "api")]);
  assert!(s.backend().get(PROJECT_LIST_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn stores_sharing_a_connection_see_each_others_writes() {
  let backend = kv().await;
  let a = Store::new(backend.clone());
  let b = Store::new(backend);

  a.store_subscription(&subscription("u1", "c1")).await.unwrap();
  b.store_subscription(&subscription("u2", "c2")).await.unwrap();

  assert_eq!(a.get_all_subscriptions("").await.unwrap().len(), 2);
  assert_eq!(b.get_all_subscriptions("u1").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscribers_lose_no_updates() {
  let s = Store::new(kv().await).with_retry_policy(RetryPolicy {
    max_attempts: 50,
    backoff:      Duration::from_millis(2),
  });

  let tasks: Vec<_> = (0..6)
    .map(|i| {
      let s = s.clone();
      tokio::spawn(async move { s.store_subscription(&subscription("u1", &format!("c{i}"))).await })
    })
    .collect();
  for task in tasks {
    task.await.unwrap().unwrap();
  }

  assert_eq!(s.get_all_subscriptions("u1").await.unwrap().len(), 6);
  assert!(s.backend().get(SUBSCRIPTION_LIST_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn oauth_state_round_trips_through_ttl_column() {
  let s = Store::new(kv().await);
  let state = s.store_oauth_state("u1").await.unwrap();
  s.verify_oauth_state("u1", &state).await.unwrap();
  assert!(s.verify_oauth_state("u1", &state).await.is_err());
}
