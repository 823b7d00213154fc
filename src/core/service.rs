use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::core::resolver::build_match_views;
use crate::core::selector::CandidateSelector;
use crate::error::{MatchError, MatchResult};
use crate::models::{
    CandidateFilters, LikeOutcome, MatchView, ResetSummary, UpsertPreferenceRequest,
    UserPreference,
};
use crate::services::notifier::{Notification, NotificationDispatcher};
use crate::services::store::{InterestLedger, PreferenceStore, ProfileDirectory};

/// Matching core: preference access, candidate selection, the interest
/// ledger and match resolution behind one transport-agnostic facade.
///
/// Every collaborator is injected at construction; nothing is global.
#[derive(Clone)]
pub struct MatchService {
    preferences: Arc<dyn PreferenceStore>,
    ledger: Arc<dyn InterestLedger>,
    profiles: Arc<dyn ProfileDirectory>,
    dispatcher: NotificationDispatcher,
    selector: CandidateSelector,
    request_timeout: Duration,
}

impl MatchService {
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        ledger: Arc<dyn InterestLedger>,
        profiles: Arc<dyn ProfileDirectory>,
        dispatcher: NotificationDispatcher,
        selector: CandidateSelector,
        request_timeout: Duration,
    ) -> Self {
        Self {
            preferences,
            ledger,
            profiles,
            dispatcher,
            selector,
            request_timeout,
        }
    }

    /// Run a store-touching future under the request timeout.
    /// Dropping a pending sqlx transaction rolls it back.
    async fn bounded<T, F>(&self, fut: F) -> MatchResult<T>
    where
        F: Future<Output = MatchResult<T>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MatchError::Timeout(self.request_timeout.as_millis() as u64)),
        }
    }

    pub async fn upsert_preference(
        &self,
        acting_uid: &str,
        uid: &str,
        request: UpsertPreferenceRequest,
    ) -> MatchResult<UserPreference> {
        ensure_owner(acting_uid, uid)?;

        let mut request = request;
        request.location = request.location.trim().to_string();
        request.validate()?;

        let preference = UserPreference {
            uid: uid.to_string(),
            age: request.age,
            gender: request.gender,
            description: request.description,
            lifestyles: request.lifestyles,
            interests: request.interests,
            location: request.location,
            min_budget: request.min_budget,
            max_budget: request.max_budget,
            completed: request.completed,
            updated_at: chrono::Utc::now(),
        };

        let stored = self
            .bounded(self.preferences.upsert_preference(preference))
            .await?;

        tracing::info!("Preference saved for {} (completed: {})", uid, stored.completed);
        Ok(stored)
    }

    pub async fn get_preference(&self, uid: &str) -> MatchResult<UserPreference> {
        self.bounded(self.preferences.get_preference(uid))
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("Preference not found for {}", uid)))
    }

    /// Remove only the preference row; like/pass history is left in place
    pub async fn delete_preference(&self, acting_uid: &str, uid: &str) -> MatchResult<()> {
        ensure_owner(acting_uid, uid)?;

        let deleted = self.bounded(self.preferences.delete_preference(uid)).await?;
        if !deleted {
            return Err(MatchError::NotFound(format!("Preference not found for {}", uid)));
        }

        tracing::info!("Preference deleted for {}", uid);
        Ok(())
    }

    pub async fn find_candidates(
        &self,
        uid: &str,
        filters: &CandidateFilters,
    ) -> MatchResult<Vec<UserPreference>> {
        self.bounded(async {
            let requester = self
                .preferences
                .get_preference(uid)
                .await?
                .filter(|p| p.completed)
                .ok_or_else(|| {
                    MatchError::NotFound(format!("No completed preference for {}", uid))
                })?;

            let excluded = self.ledger.excluded_uids(uid).await?;
            let query = self.selector.build_query(&requester, filters, excluded);
            let pool = self.preferences.query_candidates(&query).await?;
            let candidates = self.selector.select(&query, pool);

            tracing::info!(
                "Returning {} candidates for {} (excluded: {})",
                candidates.len(),
                uid,
                query.exclude_uids.len()
            );

            Ok::<_, MatchError>(candidates)
        })
        .await
    }

    pub async fn record_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<LikeOutcome> {
        ensure_distinct(liker_uid, liked_uid, "like")?;

        let outcome = self
            .bounded(self.ledger.record_like(liker_uid, liked_uid))
            .await?;

        if outcome.created {
            let notification = if outcome.mutual {
                tracing::info!("New match: {} <-> {}", liker_uid, liked_uid);
                Notification::new_match(liker_uid, liked_uid)
            } else {
                Notification::new_like(liker_uid, liked_uid)
            };
            self.dispatcher.dispatch(notification);
        } else {
            tracing::debug!("Repeat like {} -> {} ignored", liker_uid, liked_uid);
        }

        Ok(outcome)
    }

    pub async fn record_pass(&self, user_uid: &str, passed_uid: &str) -> MatchResult<()> {
        ensure_distinct(user_uid, passed_uid, "pass")?;

        let created = self
            .bounded(self.ledger.record_pass(user_uid, passed_uid))
            .await?;

        tracing::debug!(
            "Recorded pass {} -> {} (new: {})",
            user_uid,
            passed_uid,
            created
        );
        Ok(())
    }

    pub async fn list_matches(&self, uid: &str) -> MatchResult<Vec<MatchView>> {
        let (partners, preferences) = self
            .bounded(async {
                let partners = self.ledger.list_mutual(uid).await?;
                let uids: Vec<String> = partners.iter().map(|p| p.uid.clone()).collect();
                let preferences = self.preferences.get_preferences(&uids).await?;
                Ok::<_, MatchError>((partners, preferences))
            })
            .await?;

        if partners.is_empty() {
            return Ok(vec![]);
        }

        let uids: Vec<String> = partners.iter().map(|p| p.uid.clone()).collect();
        // Profile directory is an external collaborator; degrade to bare views
        let cards = match self.bounded(self.profiles.get_cards(&uids)).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!("Profile enrichment failed for {}'s matches: {}", uid, e);
                vec![]
            }
        };

        Ok(build_match_views(partners, cards, preferences))
    }

    /// True only when both directional rows exist and both are mutual
    pub async fn check_match(&self, uid_a: &str, uid_b: &str) -> MatchResult<bool> {
        ensure_distinct(uid_a, uid_b, "match check")?;

        self.bounded(async {
            let (forward, reverse) = tokio::try_join!(
                self.ledger.get_like(uid_a, uid_b),
                self.ledger.get_like(uid_b, uid_a)
            )?;

            Ok::<_, MatchError>(matches!(
                (forward, reverse),
                (Some(f), Some(r)) if f.mutual && r.mutual
            ))
        })
        .await
    }

    pub async fn unmatch(&self, uid_a: &str, uid_b: &str) -> MatchResult<()> {
        ensure_distinct(uid_a, uid_b, "unmatch")?;

        let removed = self.bounded(self.ledger.delete_pair(uid_a, uid_b)).await?;
        tracing::info!("Unmatched {} and {} ({} rows removed)", uid_a, uid_b, removed);
        Ok(())
    }

    pub async fn reset_all(&self, uid: &str) -> MatchResult<ResetSummary> {
        self.bounded(self.ledger.reset_all(uid)).await
    }

    pub async fn health_check(&self) -> bool {
        self.bounded(self.preferences.health_check())
            .await
            .unwrap_or(false)
    }

    /// Close pooled store connections
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down match service");
        self.preferences.close().await;
    }
}

fn ensure_owner(acting_uid: &str, uid: &str) -> MatchResult<()> {
    if acting_uid != uid {
        return Err(MatchError::Forbidden(format!(
            "{} may not modify the preference of {}",
            acting_uid, uid
        )));
    }
    Ok(())
}

fn ensure_distinct(uid: &str, other_uid: &str, action: &str) -> MatchResult<()> {
    if uid.trim().is_empty() || other_uid.trim().is_empty() {
        return Err(MatchError::InvalidArgument("uid must not be empty".into()));
    }
    if uid == other_uid {
        return Err(MatchError::InvalidArgument(format!(
            "cannot {} yourself",
            action
        )));
    }
    Ok(())
}
