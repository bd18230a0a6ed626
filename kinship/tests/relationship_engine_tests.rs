//! Integration tests for the relationship engine, reconciler and listings
//!
//! Most tests run against the in-memory store. Partial failures are simulated
//! with [`FlakyStore`], which fails writes to one chosen record a set number
//! of times before delegating to the in-memory store. [`GatedStore`] holds one
//! batched read open so another operation can run inside it.

use async_trait::async_trait;
use kinship::config::ConfigBuilder;
use kinship::models::{EdgeField, ListDirection, RelationshipStatus, UserId, UserRecord};
use kinship::relationships::{RelationshipError, RelationshipOutcome};
use kinship::storage::{BaseStore, MemoryUserStore, StorageError, UserStore};
use kinship::Kinship;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

fn id(value: &str) -> UserId {
    UserId::new(value).unwrap()
}

/// Memory store whose writes to one record fail with a transient error.
#[derive(Debug, Default)]
struct FlakyStore {
    inner: MemoryUserStore,
    failing_owner: Mutex<Option<UserId>>,
    failures_left: AtomicUsize,
}

impl FlakyStore {
    fn fail_writes_to(&self, owner: &str, times: usize) {
        *self.failing_owner.lock().unwrap() = Some(id(owner));
        self.failures_left.store(times, Ordering::SeqCst);
    }

    fn heal(&self) {
        self.failures_left.store(0, Ordering::SeqCst);
    }

    fn check(&self, owner: &UserId) -> Result<(), StorageError> {
        let failing = self.failing_owner.lock().unwrap().as_ref() == Some(owner);
        if failing
            && self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(StorageError::Temporary(format!("write to {} timed out", owner)));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseStore for FlakyStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        self.inner.health_check().await
    }

    async fn get_metadata(&self) -> Result<serde_json::Value, StorageError> {
        self.inner.get_metadata().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.inner.close().await
    }
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, StorageError> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        self.inner.get_user(id).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StorageError> {
        self.inner.get_users(ids).await
    }

    async fn add_to_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> Result<(), StorageError> {
        self.check(id)?;
        self.inner.add_to_set(id, field, value).await
    }

    async fn remove_from_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> Result<(), StorageError> {
        self.check(id)?;
        self.inner.remove_from_set(id, field, value).await
    }
}

/// Memory store that, once armed, parks the next batched read after taking
/// its snapshot and holds it until released.
#[derive(Debug, Default)]
struct GatedStore {
    inner: MemoryUserStore,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl GatedStore {

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BaseStore for GatedStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        self.inner.health_check().await
    }

    async fn get_metadata(&self) -> Result<serde_json::Value, StorageError> {
        self.inner.get_metadata().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.inner.close().await
    }
}

#[async_trait]
impl UserStore for GatedStore {
    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, StorageError> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        self.inner.get_user(id).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StorageError> {
        let snapshot = self.inner.get_users(ids).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        snapshot
    }

    async fn add_to_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> Result<(), StorageError> {
        self.inner.add_to_set(id, field, value).await
    }

    async fn remove_from_set(
        &self,
        id: &UserId,
        field: EdgeField,
        value: &UserId,
    ) -> Result<(), StorageError> {
        self.inner.remove_from_set(id, field, value).await
    }
}

async fn kinship_with(store: Arc<dyn UserStore>, users: &[&str]) -> Kinship {
    for user in users {
        store
            .create_user(UserRecord::new(id(user)).with_display_name(user.to_uppercase()))
            .await
            .unwrap();
    }
    let config = ConfigBuilder::testing().build().unwrap();
    Kinship::with_store(store, config)
}

async fn create_kinship(users: &[&str]) -> Kinship {
    kinship_with(Arc::new(MemoryUserStore::new()), users).await
}

async fn record(kinship: &Kinship, user: &str) -> UserRecord {
    kinship.store().get_user(&id(user)).await.unwrap().unwrap()
}

/// Check mirror consistency and exclusivity for every pair of `users`.
async fn assert_invariants(kinship: &Kinship, users: &[&str]) {
    for a in users {
        let a_record = record(kinship, a).await;
        for field in [EdgeField::Friends, EdgeField::Pending, EdgeField::Requested] {
            assert!(!a_record.has_edge(field, &id(a)), "{} has a self edge", a);
        }
        for b in users.iter().filter(|b| *b != a) {
            let b_record = record(kinship, b).await;
            assert_eq!(
                a_record.has_edge(EdgeField::Pending, &id(b)),
                b_record.has_edge(EdgeField::Requested, &id(a)),
                "pending/requested mirror broken for {} -> {}",
                a,
                b
            );
            assert_eq!(
                a_record.has_edge(EdgeField::Friends, &id(b)),
                b_record.has_edge(EdgeField::Friends, &id(a)),
                "friends mirror broken for {} / {}",
                a,
                b
            );
            if a_record.has_edge(EdgeField::Friends, &id(b)) {
                assert!(!a_record.has_edge(EdgeField::Pending, &id(b)));
                assert!(!a_record.has_edge(EdgeField::Requested, &id(b)));
            }
        }
    }
}

mod transitions {
    use super::*;

    #[tokio::test]
    async fn test_send_then_accept_round_trip() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();

        let sent = engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        assert_eq!(sent, RelationshipOutcome::RequestSent);

        let alice = record(&kinship, "alice").await;
        let bob = record(&kinship, "bob").await;
        assert!(alice.pending.contains(&id("bob")));
        assert!(bob.requested.contains(&id("alice")));

        let accepted = engine
            .accept_request(&id("bob"), &id("alice"))
            .await
            .unwrap();
        assert_eq!(accepted, RelationshipOutcome::Accepted);
        assert!(accepted.made_friends());

        let alice = record(&kinship, "alice").await;
        let bob = record(&kinship, "bob").await;
        assert!(alice.friends.contains(&id("bob")));
        assert!(bob.friends.contains(&id("alice")));
        assert!(alice.pending.is_empty());
        assert!(bob.requested.is_empty());
        assert_invariants(&kinship, &["alice", "bob"]).await;
    }

    #[tokio::test]
    async fn test_reject_then_resend() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();

        engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        let after_send = (
            record(&kinship, "alice").await.pending,
            record(&kinship, "bob").await.requested,
        );

        let rejected = engine
            .reject_request(&id("bob"), &id("alice"))
            .await
            .unwrap();
        assert_eq!(rejected, RelationshipOutcome::Rejected);

        let alice = record(&kinship, "alice").await;
        let bob = record(&kinship, "bob").await;
        assert!(alice.pending.is_empty() && bob.requested.is_empty());
        assert!(alice.friends.is_empty() && bob.friends.is_empty());

        let resent = engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        assert_eq!(resent, RelationshipOutcome::RequestSent);
        assert_eq!(
            (
                record(&kinship, "alice").await.pending,
                record(&kinship, "bob").await.requested
            ),
            after_send
        );
    }

    #[tokio::test]
    async fn test_cancel_twice() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();

        engine.send_request(&id("alice"), &id("bob")).await.unwrap();

        let first = engine
            .cancel_request(&id("alice"), &id("bob"))
            .await
            .unwrap();
        assert_eq!(first, RelationshipOutcome::Cancelled);

        let second = engine
            .cancel_request(&id("alice"), &id("bob"))
            .await
            .unwrap();
        assert_eq!(second, RelationshipOutcome::NoChange);

        assert!(record(&kinship, "alice").await.pending.is_empty());
        assert!(record(&kinship, "bob").await.requested.is_empty());
    }

    #[tokio::test]
    async fn test_remove_friend_reports_success() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();

        engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        engine
            .accept_request(&id("bob"), &id("alice"))
            .await
            .unwrap();

        let removed = engine
            .remove_friend(&id("alice"), &id("bob"))
            .await
            .unwrap();
        assert_eq!(removed, RelationshipOutcome::Removed);
        assert!(record(&kinship, "alice").await.friends.is_empty());
        assert!(record(&kinship, "bob").await.friends.is_empty());

        let again = engine
            .remove_friend(&id("alice"), &id("bob"))
            .await
            .unwrap();
        assert_eq!(again, RelationshipOutcome::NoChange);
    }

    #[tokio::test]
    async fn test_mutual_request_auto_accepts() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();

        engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        let outcome = engine.send_request(&id("bob"), &id("alice")).await.unwrap();
        assert_eq!(outcome, RelationshipOutcome::AutoAccepted);

        let alice = record(&kinship, "alice").await;
        let bob = record(&kinship, "bob").await;
        assert!(alice.friends.contains(&id("bob")) && bob.friends.contains(&id("alice")));
        assert!(alice.pending.is_empty() && alice.requested.is_empty());
        assert!(bob.pending.is_empty() && bob.requested.is_empty());
    }

    #[tokio::test]
    async fn test_send_is_idempotent() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();

        engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        let second = engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        assert_eq!(second, RelationshipOutcome::AlreadyPending);

        assert_eq!(record(&kinship, "alice").await.pending.len(), 1);
        assert_eq!(record(&kinship, "bob").await.requested.len(), 1);
    }

    #[tokio::test]
    async fn test_reject_without_request_is_a_no_op() {
        let kinship = create_kinship(&["alice", "bob"]).await;

        let outcome = kinship
            .engine()
            .reject_request(&id("bob"), &id("alice"))
            .await
            .unwrap();
        assert_eq!(outcome, RelationshipOutcome::NoChange);
        assert_invariants(&kinship, &["alice", "bob"]).await;
    }
}

mod errors {
    use super::*;

    #[tokio::test]
    async fn test_self_reference_is_rejected_everywhere() {
        let kinship = create_kinship(&["alice"]).await;
        let engine = kinship.engine();
        let alice = id("alice");

        assert!(matches!(
            engine.send_request(&alice, &alice).await,
            Err(RelationshipError::SelfReference(_))
        ));
        assert!(matches!(
            engine.accept_request(&alice, &alice).await,
            Err(RelationshipError::SelfReference(_))
        ));
        assert!(matches!(
            engine.reject_request(&alice, &alice).await,
            Err(RelationshipError::SelfReference(_))
        ));
        assert!(matches!(
            engine.cancel_request(&alice, &alice).await,
            Err(RelationshipError::SelfReference(_))
        ));
        assert!(matches!(
            engine.remove_friend(&alice, &alice).await,
            Err(RelationshipError::SelfReference(_))
        ));

        let alice_record = record(&kinship, "alice").await;
        assert!(alice_record.counterparts().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let kinship = create_kinship(&["alice"]).await;

        let err = kinship
            .engine()
            .send_request(&id("alice"), &id("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelationshipError::NotFound(ref user) if user == &id("ghost")));
        assert!(record(&kinship, "alice").await.pending.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_actor_is_unauthorized() {
        let kinship = create_kinship(&["bob"]).await;

        let err = kinship
            .engine()
            .send_request(&id("ghost"), &id("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelationshipError::Unauthorized(_)));

        let err = kinship
            .listing()
            .list_friends(&id("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelationshipError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_send_to_friend_is_already_related() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();

        engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        engine
            .accept_request(&id("bob"), &id("alice"))
            .await
            .unwrap();

        for (actor, target) in [("alice", "bob"), ("bob", "alice")] {
            let err = engine
                .send_request(&id(actor), &id(target))
                .await
                .unwrap_err();
            assert!(matches!(err, RelationshipError::AlreadyRelated { .. }));
        }
        assert_invariants(&kinship, &["alice", "bob"]).await;
    }

    #[tokio::test]
    async fn test_accept_without_request_is_not_found() {
        let kinship = create_kinship(&["alice", "bob"]).await;

        let err = kinship
            .engine()
            .accept_request(&id("bob"), &id("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelationshipError::NotFound(ref user) if user == &id("alice")));
    }

    #[tokio::test]
    async fn test_one_sided_friendship_is_repaired_on_send() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        kinship
            .store()
            .add_to_set(&id("bob"), EdgeField::Friends, &id("alice"))
            .await
            .unwrap();

        let err = kinship
            .engine()
            .send_request(&id("alice"), &id("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelationshipError::AlreadyRelated { .. }));
        assert!(record(&kinship, "alice").await.friends.contains(&id("bob")));
    }
}

mod status_and_listing {
    use super::*;

    #[tokio::test]
    async fn test_relationship_status_from_both_sides() {
        let kinship = create_kinship(&["alice", "bob", "carol"]).await;
        let engine = kinship.engine();

        engine.send_request(&id("alice"), &id("bob")).await.unwrap();

        assert_eq!(
            engine
                .relationship_status(&id("alice"), &id("bob"))
                .await
                .unwrap(),
            RelationshipStatus::RequestSent
        );
        assert_eq!(
            engine
                .relationship_status(&id("bob"), &id("alice"))
                .await
                .unwrap(),
            RelationshipStatus::RequestReceived
        );
        assert_eq!(
            engine
                .relationship_status(&id("alice"), &id("carol"))
                .await
                .unwrap(),
            RelationshipStatus::None
        );
        assert_eq!(
            engine
                .relationship_status(&id("alice"), &id("alice"))
                .await
                .unwrap(),
            RelationshipStatus::Myself
        );

        engine
            .accept_request(&id("bob"), &id("alice"))
            .await
            .unwrap();
        let status = engine
            .relationship_status(&id("bob"), &id("alice"))
            .await
            .unwrap();
        assert_eq!(status, RelationshipStatus::Friends);
        assert!(status.is_friend());
    }

    #[tokio::test]
    async fn test_listings_are_ordered_summaries() {
        let kinship = create_kinship(&["alice", "bob", "carol", "dave"]).await;
        let engine = kinship.engine();

        engine.send_request(&id("alice"), &id("dave")).await.unwrap();
        engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        engine.send_request(&id("carol"), &id("alice")).await.unwrap();

        let sent = kinship
            .listing()
            .list_requests(&id("alice"), ListDirection::Sent)
            .await
            .unwrap();
        let sent_ids: Vec<_> = sent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(sent_ids, vec!["bob", "dave"]);
        assert_eq!(sent[0].display_name.as_deref(), Some("BOB"));

        let received = kinship
            .listing()
            .list_requests(&id("alice"), ListDirection::Received)
            .await
            .unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id, id("carol"));

        engine
            .accept_request(&id("alice"), &id("carol"))
            .await
            .unwrap();
        let friends = kinship.listing().list_friends(&id("alice")).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].id, id("carol"));
    }

    #[tokio::test]
    async fn test_listing_skips_missing_users() {
        let kinship = create_kinship(&["alice", "bob"]).await;
        kinship
            .store()
            .add_to_set(&id("alice"), EdgeField::Pending, &id("ghost"))
            .await
            .unwrap();
        kinship
            .engine()
            .send_request(&id("alice"), &id("bob"))
            .await
            .unwrap();

        let sent = kinship
            .listing()
            .list_requests(&id("alice"), ListDirection::Sent)
            .await
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, id("bob"));
    }

    #[tokio::test]
    async fn test_reconcile_user_drops_self_edges() {
        let kinship = create_kinship(&["alice"]).await;
        kinship
            .store()
            .add_to_set(&id("alice"), EdgeField::Friends, &id("alice"))
            .await
            .unwrap();

        let repairs = kinship
            .reconciler()
            .reconcile_user(&id("alice"))
            .await
            .unwrap();
        assert_eq!(repairs.len(), 1);
        assert!(record(&kinship, "alice").await.friends.is_empty());
    }
}

mod partial_failures {
    use super::*;

    async fn flaky_kinship(users: &[&str]) -> (Arc<FlakyStore>, Kinship) {
        let store = Arc::new(FlakyStore::default());
        let kinship = kinship_with(store.clone(), users).await;
        (store, kinship)
    }

    #[tokio::test]
    async fn test_mirror_failure_is_retried() {
        let (store, kinship) = flaky_kinship(&["alice", "bob"]).await;
        store.fail_writes_to("bob", 1);

        let outcome = kinship
            .engine()
            .send_request(&id("alice"), &id("bob"))
            .await
            .unwrap();
        assert_eq!(outcome, RelationshipOutcome::RequestSent);
        assert!(record(&kinship, "bob").await.requested.contains(&id("alice")));
    }

    #[tokio::test]
    async fn test_persistent_mirror_failure_is_completed_by_listing() {
        let (store, kinship) = flaky_kinship(&["alice", "bob"]).await;
        store.fail_writes_to("bob", 10);

        let err = kinship
            .engine()
            .send_request(&id("alice"), &id("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelationshipError::TransientStore(_)));

        // The local write stays committed
        assert!(record(&kinship, "alice").await.pending.contains(&id("bob")));
        assert!(record(&kinship, "bob").await.requested.is_empty());

        store.heal();
        let sent = kinship
            .listing()
            .list_requests(&id("alice"), ListDirection::Sent)
            .await
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert!(record(&kinship, "bob").await.requested.contains(&id("alice")));
        assert_invariants(&kinship, &["alice", "bob"]).await;
    }

    #[tokio::test]
    async fn test_accept_retry_completes_half_accept() {
        let (store, kinship) = flaky_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();
        engine.send_request(&id("alice"), &id("bob")).await.unwrap();

        store.fail_writes_to("alice", 10);
        let err = engine
            .accept_request(&id("bob"), &id("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelationshipError::TransientStore(_)));
        assert!(record(&kinship, "bob").await.friends.contains(&id("alice")));
        assert!(!record(&kinship, "alice").await.friends.contains(&id("bob")));

        store.heal();
        let retried = engine
            .accept_request(&id("bob"), &id("alice"))
            .await
            .unwrap();
        assert_eq!(retried, RelationshipOutcome::NoChange);

        let alice = record(&kinship, "alice").await;
        assert!(alice.friends.contains(&id("bob")));
        assert!(alice.pending.is_empty());
        assert_invariants(&kinship, &["alice", "bob"]).await;
    }

    #[tokio::test]
    async fn test_half_cancel_is_completed_by_reconcile() {
        let (store, kinship) = flaky_kinship(&["alice", "bob"]).await;
        let engine = kinship.engine();
        engine.send_request(&id("alice"), &id("bob")).await.unwrap();

        store.fail_writes_to("bob", 10);
        assert!(
            engine
                .cancel_request(&id("alice"), &id("bob"))
                .await
                .is_err()
        );
        store.heal();

        kinship
            .reconciler()
            .reconcile_pair(&id("alice"), &id("bob"))
            .await
            .unwrap();
        assert!(record(&kinship, "bob").await.requested.is_empty());
        assert_invariants(&kinship, &["alice", "bob"]).await;
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutual_requests_become_friends() {
        for _ in 0..20 {
            let kinship = create_kinship(&["alice", "bob"]).await;

            let a = kinship.clone();
            let b = kinship.clone();
            let first =
                tokio::spawn(async move { a.engine().send_request(&id("alice"), &id("bob")).await });
            let second =
                tokio::spawn(async move { b.engine().send_request(&id("bob"), &id("alice")).await });
            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();

            kinship
                .reconciler()
                .reconcile_user(&id("alice"))
                .await
                .unwrap();
            kinship
                .reconciler()
                .reconcile_user(&id("bob"))
                .await
                .unwrap();

            let alice = record(&kinship, "alice").await;
            let bob = record(&kinship, "bob").await;
            assert!(alice.friends.contains(&id("bob")));
            assert!(bob.friends.contains(&id("alice")));
            assert!(alice.pending.is_empty() && bob.requested.is_empty());
            assert!(bob.pending.is_empty() && alice.requested.is_empty());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_concurrent_sends_keep_one_edge() {
        let kinship = create_kinship(&["alice", "bob"]).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let kinship = kinship.clone();
                tokio::spawn(async move {
                    kinship
                        .engine()
                        .send_request(&id("alice"), &id("bob"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(record(&kinship, "alice").await.pending.len(), 1);
        assert_eq!(record(&kinship, "bob").await.requested.len(), 1);
        assert_invariants(&kinship, &["alice", "bob"]).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_removal_during_counterpart_listing_stays_removed() {
        let store = Arc::new(GatedStore::default());
        let kinship = kinship_with(store.clone(), &["alice", "bob"]).await;
        kinship
            .engine()
            .send_request(&id("alice"), &id("bob"))
            .await
            .unwrap();
        kinship
            .engine()
            .accept_request(&id("bob"), &id("alice"))
            .await
            .unwrap();

        // bob's listing snapshots alice while they are still friends
        store.arm();
        let listing = {
            let kinship = kinship.clone();
            tokio::spawn(async move { kinship.listing().list_friends(&id("bob")).await })
        };
        store.reached.notified().await;

        let outcome = kinship
            .engine()
            .remove_friend(&id("alice"), &id("bob"))
            .await
            .unwrap();
        assert_eq!(outcome, RelationshipOutcome::Removed);

        store.release.notify_one();
        listing.await.unwrap().unwrap();

        assert!(record(&kinship, "alice").await.friends.is_empty());
        assert!(record(&kinship, "bob").await.friends.is_empty());
        assert_invariants(&kinship, &["alice", "bob"]).await;

        // Later reconciliation does not bring the friendship back
        kinship
            .reconciler()
            .reconcile_user(&id("bob"))
            .await
            .unwrap();
        assert_eq!(
            kinship
                .engine()
                .relationship_status(&id("alice"), &id("bob"))
                .await
                .unwrap(),
            RelationshipStatus::None
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_during_target_listing_is_not_restored() {
        let store = Arc::new(GatedStore::default());
        let kinship = kinship_with(store.clone(), &["alice", "bob", "carol"]).await;
        let engine = kinship.engine();
        engine.send_request(&id("alice"), &id("bob")).await.unwrap();
        engine.send_request(&id("carol"), &id("bob")).await.unwrap();

        store.arm();
        let listing = {
            let kinship = kinship.clone();
            tokio::spawn(async move {
                kinship
                    .listing()
                    .list_requests(&id("bob"), ListDirection::Received)
                    .await
            })
        };
        store.reached.notified().await;

        assert_eq!(
            engine.cancel_request(&id("carol"), &id("bob")).await.unwrap(),
            RelationshipOutcome::Cancelled
        );

        store.release.notify_one();
        listing.await.unwrap().unwrap();

        assert!(record(&kinship, "carol").await.pending.is_empty());
        assert_eq!(
            record(&kinship, "bob").await.requested,
            [id("alice")].into_iter().collect()
        );
        assert_invariants(&kinship, &["alice", "bob", "carol"]).await;

        let received = kinship
            .listing()
            .list_requests(&id("bob"), ListDirection::Received)
            .await
            .unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id, id("alice"));
    }

    enum Op {
        Send,
        Accept,
        Reject,
        Cancel,
        Remove,
    }

    enum Expect {
        Outcome(RelationshipOutcome),
        AlreadyRelated,
        NotFound,
    }

    #[tokio::test]
    async fn test_interleaved_operations_quiesce_consistently() {
        use Expect::{AlreadyRelated, NotFound, Outcome};
        use RelationshipOutcome::*;

        let users = ["alice", "bob", "carol", "dave"];
        let kinship = create_kinship(&users).await;
        let engine = kinship.engine();

        let script = [
            (Op::Send, "alice", "bob", Outcome(RequestSent)),
            (Op::Send, "alice", "bob", Outcome(AlreadyPending)),
            (Op::Send, "carol", "alice", Outcome(RequestSent)),
            (Op::Send, "alice", "carol", Outcome(AutoAccepted)),
            (Op::Accept, "bob", "alice", Outcome(Accepted)),
            (Op::Send, "bob", "alice", AlreadyRelated),
            (Op::Accept, "bob", "alice", Outcome(NoChange)),
            (Op::Send, "dave", "bob", Outcome(RequestSent)),
            (Op::Reject, "bob", "dave", Outcome(Rejected)),
            (Op::Reject, "bob", "dave", Outcome(NoChange)),
            (Op::Send, "dave", "carol", Outcome(RequestSent)),
            (Op::Cancel, "dave", "carol", Outcome(Cancelled)),
            (Op::Accept, "carol", "dave", NotFound),
            (Op::Remove, "alice", "bob", Outcome(Removed)),
            (Op::Remove, "bob", "alice", Outcome(NoChange)),
            (Op::Remove, "carol", "alice", Outcome(Removed)),
            (Op::Send, "bob", "alice", Outcome(RequestSent)),
            (Op::Cancel, "dave", "carol", Outcome(NoChange)),
        ];

        for (step, (op, actor, other, expect)) in script.into_iter().enumerate() {
            let (actor_id, other_id) = (id(actor), id(other));
            let result = match op {
                Op::Send => engine.send_request(&actor_id, &other_id).await,
                Op::Accept => engine.accept_request(&actor_id, &other_id).await,
                Op::Reject => engine.reject_request(&actor_id, &other_id).await,
                Op::Cancel => engine.cancel_request(&actor_id, &other_id).await,
                Op::Remove => engine.remove_friend(&actor_id, &other_id).await,
            };
            match (expect, result) {
                (Outcome(expected), Ok(outcome)) => {
                    assert_eq!(outcome, expected, "step {}: {} -> {}", step, actor, other)
                }
                (AlreadyRelated, Err(RelationshipError::AlreadyRelated { .. })) => {}
                (NotFound, Err(RelationshipError::NotFound(missing))) => {
                    assert_eq!(missing, other_id)
                }
                (_, result) => panic!("step {}: {} -> {} gave {:?}", step, actor, other, result),
            }

            // Listing reconciles; it must leave the pairs as they were
            kinship.listing().list_friends(&actor_id).await.unwrap();
            assert_invariants(&kinship, &users).await;
        }

        let alice = record(&kinship, "alice").await;
        assert!(alice.friends.is_empty());
        assert_eq!(alice.requested, [id("bob")].into_iter().collect());
        assert!(record(&kinship, "dave").await.pending.is_empty());
    }
}

#[tokio::test]
async fn test_mirror_retry_uses_configured_backoff() {
    let store = Arc::new(FlakyStore::default());
    store
        .create_user(UserRecord::new(id("alice")))
        .await
        .unwrap();
    store.create_user(UserRecord::new(id("bob"))).await.unwrap();
    let config = ConfigBuilder::testing()
        .with_mirror_retries(0, Duration::from_millis(1))
        .build()
        .unwrap();
    let kinship = Kinship::with_store(store.clone(), config);

    // Without retries a single failure surfaces to the caller
    store.fail_writes_to("bob", 1);
    let err = kinship
        .engine()
        .send_request(&id("alice"), &id("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelationshipError::TransientStore(_)));

    // A plain retry by the caller completes the edge
    let outcome = kinship
        .engine()
        .send_request(&id("alice"), &id("bob"))
        .await
        .unwrap();
    assert_eq!(outcome, RelationshipOutcome::RequestSent);
    assert_invariants(&kinship, &["alice", "bob"]).await;
}
