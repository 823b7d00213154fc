// Integration tests for Roommate Match

use async_trait::async_trait;
use roommate_match::core::{CandidateSelector, MatchService};
use roommate_match::error::{MatchError, MatchResult};
use roommate_match::models::{
    CandidateFilters, Gender, Like, LikeOutcome, MatchedPartner, ProfileCard, ResetSummary,
    UpsertPreferenceRequest,
};
use roommate_match::services::{
    DeliveryResult, InMemoryStore, InterestLedger, LogNotifier, NotificationDispatcher, Notifier,
    NotifyError,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn build_service(store: Arc<InMemoryStore>, notifier: Arc<dyn Notifier>) -> MatchService {
    build_service_with_ledger(store.clone(), store, notifier, Duration::from_secs(5))
}

fn build_service_with_ledger(
    store: Arc<InMemoryStore>,
    ledger: Arc<dyn InterestLedger>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
) -> MatchService {
    let dispatcher = NotificationDispatcher::new(
        notifier,
        Duration::from_millis(200),
        1,
        Duration::from_millis(1),
    );
    MatchService::new(
        store.clone(),
        ledger,
        store,
        dispatcher,
        CandidateSelector::default(),
        timeout,
    )
}

fn preference_request(location: &str, min_budget: f64, max_budget: f64) -> UpsertPreferenceRequest {
    UpsertPreferenceRequest {
        age: 25,
        gender: Gender::Female,
        description: "Looking for a quiet flatmate".to_string(),
        lifestyles: BTreeSet::from(["non_smoker".to_string()]),
        interests: BTreeSet::from(["cooking".to_string()]),
        location: location.to_string(),
        min_budget,
        max_budget,
        completed: true,
    }
}

async fn seed(service: &MatchService, uid: &str, location: &str, min: f64, max: f64) {
    service
        .upsert_preference(uid, uid, preference_request(location, min, max))
        .await
        .expect("seed preference");
}

fn uids(prefs: &[roommate_match::UserPreference]) -> Vec<String> {
    let mut uids: Vec<String> = prefs.iter().map(|p| p.uid.clone()).collect();
    uids.sort();
    uids
}

/// Records every notification it is asked to deliver
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        target_uid: &str,
        _title: &str,
        _body: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<DeliveryResult, NotifyError> {
        let kind = metadata.get("type").cloned().unwrap_or_default();
        self.sent
            .lock()
            .unwrap()
            .push((target_uid.to_string(), kind));
        Ok(DeliveryResult::Delivered {
            message_id: "test".to_string(),
        })
    }
}

impl RecordingNotifier {
    async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..100 {
            {
                let sent = self.sent.lock().unwrap();
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent.lock().unwrap().clone()
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(
        &self,
        _target_uid: &str,
        _title: &str,
        _body: &str,
        _metadata: &HashMap<String, String>,
    ) -> Result<DeliveryResult, NotifyError> {
        Err(NotifyError::ApiError {
            status: 503,
            message: "push service down".to_string(),
        })
    }
}

/// Ledger whose writes never finish inside the request timeout
struct StalledLedger {
    inner: Arc<InMemoryStore>,
}

#[async_trait]
impl InterestLedger for StalledLedger {
    async fn record_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<LikeOutcome> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        self.inner.record_like(liker_uid, liked_uid).await
    }

    async fn record_pass(&self, user_uid: &str, passed_uid: &str) -> MatchResult<bool> {
        self.inner.record_pass(user_uid, passed_uid).await
    }

    async fn get_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<Option<Like>> {
        self.inner.get_like(liker_uid, liked_uid).await
    }

    async fn excluded_uids(&self, uid: &str) -> MatchResult<Vec<String>> {
        self.inner.excluded_uids(uid).await
    }

    async fn list_mutual(&self, uid: &str) -> MatchResult<Vec<MatchedPartner>> {
        self.inner.list_mutual(uid).await
    }

    async fn delete_pair(&self, uid_a: &str, uid_b: &str) -> MatchResult<u64> {
        self.inner.delete_pair(uid_a, uid_b).await
    }

    async fn reset_all(&self, uid: &str) -> MatchResult<ResetSummary> {
        self.inner.reset_all(uid).await
    }
}

#[tokio::test]
async fn test_end_to_end_location_filter() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store, Arc::new(LogNotifier));

    seed(&service, "A", "Phnom Penh", 100.0, 300.0).await;
    seed(&service, "B", "Phnom Penh", 200.0, 400.0).await;
    seed(&service, "C", "Siem Reap", 100.0, 300.0).await;

    let filters = CandidateFilters {
        location: Some("Phnom Penh".to_string()),
        ..Default::default()
    };

    let candidates = service.find_candidates("A", &filters).await.unwrap();
    assert_eq!(uids(&candidates), vec!["B"]);
}

#[tokio::test]
async fn test_budget_overlap_against_requester_budget() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store, Arc::new(LogNotifier));

    seed(&service, "requester", "Phnom Penh", 100.0, 500.0).await;
    seed(&service, "too_expensive", "Phnom Penh", 600.0, 800.0).await;
    seed(&service, "overlapping", "Phnom Penh", 400.0, 900.0).await;

    let candidates = service
        .find_candidates("requester", &CandidateFilters::default())
        .await
        .unwrap();
    assert_eq!(uids(&candidates), vec!["overlapping"]);
}

#[tokio::test]
async fn test_like_is_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store.clone(), Arc::new(LogNotifier));

    let first = service.record_like("A", "B").await.unwrap();
    let second = service.record_like("A", "B").await.unwrap();

    assert_eq!(first.mutual, second.mutual);
    assert!(!second.mutual);
    assert_eq!(store.like_count().await, 1);
}

#[tokio::test]
async fn test_reciprocal_likes_create_match() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store.clone(), Arc::new(LogNotifier));

    assert!(!service.record_like("A", "B").await.unwrap().mutual);
    assert!(service.record_like("B", "A").await.unwrap().mutual);

    assert!(service.check_match("A", "B").await.unwrap());
    assert!(service.check_match("B", "A").await.unwrap());

    let ab = store.get_like("A", "B").await.unwrap().unwrap();
    let ba = store.get_like("B", "A").await.unwrap().unwrap();
    assert!(ab.mutual && ba.mutual);

    // A repeat after matching reports the stored flag
    assert!(service.record_like("A", "B").await.unwrap().mutual);
}

#[tokio::test]
async fn test_self_like_rejected_without_write() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store.clone(), Arc::new(LogNotifier));

    let err = assert_err!(service.record_like("A", "A").await);
    assert!(matches!(err, MatchError::InvalidArgument(_)));
    assert!(!err.is_retryable());
    assert_eq!(store.like_count().await, 0);

    let err = assert_err!(service.record_pass("A", "A").await);
    assert!(matches!(err, MatchError::InvalidArgument(_)));
    assert_eq!(store.pass_count().await, 0);
}

#[tokio::test]
async fn test_liked_and_passed_never_reappear() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store, Arc::new(LogNotifier));

    seed(&service, "A", "Phnom Penh", 100.0, 300.0).await;
    for uid in ["B", "C", "D", "E"] {
        seed(&service, uid, "Phnom Penh", 150.0, 250.0).await;
    }

    assert_ok!(service.record_pass("A", "B").await);
    assert_ok!(service.record_like("A", "C").await);

    for _ in 0..10 {
        let candidates = service
            .find_candidates("A", &CandidateFilters::default())
            .await
            .unwrap();
        let found = uids(&candidates);
        assert_eq!(found, vec!["D", "E"]);
    }
}

#[tokio::test]
async fn test_pass_does_not_affect_reverse_direction() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store, Arc::new(LogNotifier));

    seed(&service, "A", "Phnom Penh", 100.0, 300.0).await;
    seed(&service, "B", "Phnom Penh", 100.0, 300.0).await;

    service.record_pass("A", "B").await.unwrap();

    let for_b = service
        .find_candidates("B", &CandidateFilters::default())
        .await
        .unwrap();
    assert_eq!(uids(&for_b), vec!["A"]);
}

#[tokio::test]
async fn test_reset_clears_matches_and_passes() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store, Arc::new(LogNotifier));

    service.record_like("A", "B").await.unwrap();
    service.record_like("B", "A").await.unwrap();
    service.record_pass("A", "C").await.unwrap();
    service.record_pass("C", "A").await.unwrap();

    let summary = service.reset_all("A").await.unwrap();
    assert_eq!(summary.deleted_matches, 2);
    assert_eq!(summary.deleted_passes, 1);

    assert!(service.list_matches("A").await.unwrap().is_empty());
    assert!(!service.check_match("A", "B").await.unwrap());

    // Behaves as a first-ever like
    assert!(!service.record_like("A", "B").await.unwrap().mutual);

    // Nothing left to reset is not an error
    service.reset_all("nobody").await.unwrap();
    assert_eq!(
        service.reset_all("nobody").await.unwrap(),
        ResetSummary::default()
    );
}

#[tokio::test]
async fn test_unmatch_returns_pair_to_unseen() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store.clone(), Arc::new(LogNotifier));

    seed(&service, "A", "Phnom Penh", 100.0, 300.0).await;
    seed(&service, "B", "Phnom Penh", 100.0, 300.0).await;

    service.record_like("A", "B").await.unwrap();
    service.record_like("B", "A").await.unwrap();

    service.unmatch("A", "B").await.unwrap();
    assert_eq!(store.like_count().await, 0);
    assert!(!service.check_match("A", "B").await.unwrap());

    // Idempotent when nothing exists
    assert_ok!(service.unmatch("B", "A").await);

    // B is a candidate again and a new like starts one-sided
    let candidates = service
        .find_candidates("A", &CandidateFilters::default())
        .await
        .unwrap();
    assert_eq!(uids(&candidates), vec!["B"]);
    assert!(!service.record_like("A", "B").await.unwrap().mutual);
}

#[tokio::test]
async fn test_list_matches_ordered_and_enriched() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store.clone(), Arc::new(LogNotifier));

    seed(&service, "C", "Siem Reap", 100.0, 300.0).await;
    store
        .put_card(ProfileCard {
            uid: "C".to_string(),
            display_name: "Chenda".to_string(),
            image_url: Some("https://img.example/c.png".to_string()),
        })
        .await;

    service.record_like("A", "B").await.unwrap();
    service.record_like("B", "A").await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    service.record_like("A", "C").await.unwrap();
    service.record_like("C", "A").await.unwrap();
    // One-sided like is not a match
    service.record_like("A", "D").await.unwrap();

    let matches = service.list_matches("A").await.unwrap();
    let order: Vec<&str> = matches.iter().map(|m| m.uid.as_str()).collect();
    assert_eq!(order, vec!["C", "B"]);

    assert_eq!(matches[0].display_name.as_deref(), Some("Chenda"));
    assert_eq!(matches[0].location.as_deref(), Some("Siem Reap"));
    assert!(matches[1].display_name.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opposite_likes_converge() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store.clone(), Arc::new(LogNotifier));

    let rounds = 25;
    for round in 0..rounds {
        let a = format!("a{}", round);
        let b = format!("b{}", round);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                let (liker, liked) = if i % 2 == 0 {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                };
                tokio::spawn(async move { service.record_like(&liker, &liked).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(service.check_match(&a, &b).await.unwrap());
        let ab = store.get_like(&a, &b).await.unwrap().unwrap();
        let ba = store.get_like(&b, &a).await.unwrap().unwrap();
        assert!(ab.mutual && ba.mutual);
    }

    assert_eq!(store.like_count().await, rounds * 2);
}

#[tokio::test]
async fn test_notifications_follow_new_likes() {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = build_service(store, notifier.clone());

    service.record_like("A", "B").await.unwrap();
    service.record_like("A", "B").await.unwrap();
    service.record_like("B", "A").await.unwrap();

    let sent = notifier.wait_for(2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let sent_after = notifier.sent.lock().unwrap().clone();

    assert_eq!(sent.len(), 2);
    assert_eq!(sent_after.len(), 2, "repeat like must not notify");
    assert!(sent.contains(&("B".to_string(), "like".to_string())));
    assert!(sent.contains(&("A".to_string(), "match".to_string())));
}

#[tokio::test]
async fn test_notifier_failure_never_fails_like() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store.clone(), Arc::new(FailingNotifier));

    let outcome = assert_ok!(service.record_like("A", "B").await);
    assert!(!outcome.mutual);
    assert!(service.record_like("B", "A").await.unwrap().mutual);
    assert_eq!(store.like_count().await, 2);
}

#[tokio::test]
async fn test_requester_without_completed_preference() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store, Arc::new(LogNotifier));

    let err = assert_err!(
        service
            .find_candidates("ghost", &CandidateFilters::default())
            .await
    );
    assert!(matches!(err, MatchError::NotFound(_)));

    let mut draft = preference_request("Phnom Penh", 100.0, 300.0);
    draft.completed = false;
    service.upsert_preference("draft", "draft", draft).await.unwrap();

    let err = assert_err!(
        service
            .find_candidates("draft", &CandidateFilters::default())
            .await
    );
    assert!(matches!(err, MatchError::NotFound(_)));
}

#[tokio::test]
async fn test_incomplete_preferences_are_not_candidates() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store, Arc::new(LogNotifier));

    seed(&service, "A", "Phnom Penh", 100.0, 300.0).await;
    let mut draft = preference_request("Phnom Penh", 100.0, 300.0);
    draft.completed = false;
    service.upsert_preference("B", "B", draft).await.unwrap();

    let candidates = service
        .find_candidates("A", &CandidateFilters::default())
        .await
        .unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_preference_ownership_and_lifecycle() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store.clone(), Arc::new(LogNotifier));

    let err = assert_err!(
        service
            .upsert_preference("mallory", "A", preference_request("Phnom Penh", 100.0, 300.0))
            .await
    );
    assert!(matches!(err, MatchError::Forbidden(_)));

    let invalid = preference_request("Phnom Penh", 500.0, 100.0);
    let err = assert_err!(service.upsert_preference("A", "A", invalid).await);
    assert!(matches!(err, MatchError::InvalidArgument(_)));
    assert!(matches!(
        service.get_preference("A").await,
        Err(MatchError::NotFound(_))
    ));

    seed(&service, "A", "Phnom Penh", 100.0, 300.0).await;
    let replaced = service
        .upsert_preference("A", "A", preference_request("Kampot", 50.0, 80.0))
        .await
        .unwrap();
    assert_eq!(replaced.location, "Kampot");
    assert_eq!(service.get_preference("A").await.unwrap().max_budget, 80.0);

    // Deleting keeps like history in place
    service.record_like("A", "B").await.unwrap();
    assert!(matches!(
        service.delete_preference("mallory", "A").await,
        Err(MatchError::Forbidden(_))
    ));
    service.delete_preference("A", "A").await.unwrap();
    assert!(matches!(
        service.delete_preference("A", "A").await,
        Err(MatchError::NotFound(_))
    ));
    assert_eq!(store.like_count().await, 1);
}

#[tokio::test]
async fn test_stalled_write_times_out() {
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(StalledLedger {
        inner: store.clone(),
    });
    let service = build_service_with_ledger(
        store.clone(),
        ledger,
        Arc::new(LogNotifier),
        Duration::from_millis(50),
    );

    let err = assert_err!(service.record_like("A", "B").await);
    assert!(matches!(err, MatchError::Timeout(50)));
    assert!(err.is_retryable());
    assert_eq!(store.like_count().await, 0);
}

#[tokio::test]
async fn test_blank_location_rejected_and_padding_trimmed() {
    let store = Arc::new(InMemoryStore::new());
    let service = build_service(store, Arc::new(LogNotifier));

    let err = assert_err!(
        service
            .upsert_preference("A", "A", preference_request("   ", 100.0, 300.0))
            .await
    );
    assert!(matches!(err, MatchError::InvalidArgument(_)));
    assert!(matches!(
        service.get_preference("A").await,
        Err(MatchError::NotFound(_))
    ));

    let stored = service
        .upsert_preference("A", "A", preference_request("  Kampot ", 100.0, 300.0))
        .await
        .unwrap();
    assert_eq!(stored.location, "Kampot");
}
