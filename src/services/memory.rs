use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::core::filters::matches_candidate_query;
use crate::error::MatchResult;
use crate::models::{
    CandidateQuery, Like, LikeOutcome, MatchedPartner, Pass, ProfileCard, ResetSummary,
    UserPreference,
};
use crate::services::store::{InterestLedger, PreferenceStore, ProfileDirectory};

#[derive(Default)]
struct MemoryState {
    preferences: HashMap<String, UserPreference>,
    likes: HashMap<(String, String), Like>,
    passes: HashMap<(String, String), Pass>,
    cards: HashMap<String, ProfileCard>,
}

/// Process-local store used for development (`memory://`) and tests
///
/// Every write holds the single state lock, which makes the reciprocity
/// check-and-flip in `record_like` atomic.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a display card for match enrichment
    pub async fn put_card(&self, card: ProfileCard) {
        let mut state = self.state.write().await;
        state.cards.insert(card.uid.clone(), card);
    }

    /// Number of stored like rows, both directions counted
    pub async fn like_count(&self) -> usize {
        self.state.read().await.likes.len()
    }

    pub async fn pass_count(&self) -> usize {
        self.state.read().await.passes.len()
    }
}

fn key(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn upsert_preference(&self, mut preference: UserPreference) -> MatchResult<UserPreference> {
        preference.updated_at = Utc::now();
        let mut state = self.state.write().await;
        state
            .preferences
            .insert(preference.uid.clone(), preference.clone());
        Ok(preference)
    }

    async fn get_preference(&self, uid: &str) -> MatchResult<Option<UserPreference>> {
        Ok(self.state.read().await.preferences.get(uid).cloned())
    }

    async fn get_preferences(&self, uids: &[String]) -> MatchResult<Vec<UserPreference>> {
        let state = self.state.read().await;
        Ok(uids
            .iter()
            .filter_map(|uid| state.preferences.get(uid).cloned())
            .collect())
    }

    async fn delete_preference(&self, uid: &str) -> MatchResult<bool> {
        Ok(self.state.write().await.preferences.remove(uid).is_some())
    }

    async fn query_candidates(&self, query: &CandidateQuery) -> MatchResult<Vec<UserPreference>> {
        let state = self.state.read().await;
        let mut pool: Vec<UserPreference> = state
            .preferences
            .values()
            .filter(|p| matches_candidate_query(p, query))
            .cloned()
            .collect();
        drop(state);

        pool.shuffle(&mut rand::rng());
        pool.truncate(query.limit);
        Ok(pool)
    }

    async fn health_check(&self) -> MatchResult<bool> {
        Ok(true)
    }
}

#[async_trait]
impl InterestLedger for InMemoryStore {
    async fn record_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<LikeOutcome> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.likes.get(&key(liker_uid, liked_uid)) {
            return Ok(LikeOutcome {
                mutual: existing.mutual,
                created: false,
            });
        }

        let now = Utc::now();
        let reverse = state.likes.get_mut(&key(liked_uid, liker_uid));
        let mutual = match reverse {
            Some(reverse) => {
                reverse.mutual = true;
                reverse.matched_at = Some(now);
                true
            }
            None => false,
        };

        state.likes.insert(
            key(liker_uid, liked_uid),
            Like {
                liker_uid: liker_uid.to_string(),
                liked_uid: liked_uid.to_string(),
                mutual,
                created_at: now,
                matched_at: mutual.then_some(now),
            },
        );

        Ok(LikeOutcome {
            mutual,
            created: true,
        })
    }

    async fn record_pass(&self, user_uid: &str, passed_uid: &str) -> MatchResult<bool> {
        let mut state = self.state.write().await;
        let k = key(user_uid, passed_uid);
        if state.passes.contains_key(&k) {
            return Ok(false);
        }
        state.passes.insert(
            k,
            Pass {
                user_uid: user_uid.to_string(),
                passed_uid: passed_uid.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn get_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<Option<Like>> {
        Ok(self
            .state
            .read()
            .await
            .likes
            .get(&key(liker_uid, liked_uid))
            .cloned())
    }

    async fn excluded_uids(&self, uid: &str) -> MatchResult<Vec<String>> {
        let state = self.state.read().await;
        let mut excluded: Vec<String> = state
            .likes
            .keys()
            .filter(|(liker, _)| liker == uid)
            .map(|(_, liked)| liked.clone())
            .chain(
                state
                    .passes
                    .keys()
                    .filter(|(user, _)| user == uid)
                    .map(|(_, passed)| passed.clone()),
            )
            .collect();
        excluded.sort();
        excluded.dedup();
        Ok(excluded)
    }

    async fn list_mutual(&self, uid: &str) -> MatchResult<Vec<MatchedPartner>> {
        let state = self.state.read().await;
        let mut partners: Vec<MatchedPartner> = state
            .likes
            .values()
            .filter(|like| like.liker_uid == uid && like.mutual)
            .map(|like| MatchedPartner {
                uid: like.liked_uid.clone(),
                matched_at: like.matched_at.unwrap_or(like.created_at),
            })
            .collect();
        partners.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
        Ok(partners)
    }

    async fn delete_pair(&self, uid_a: &str, uid_b: &str) -> MatchResult<u64> {
        let mut state = self.state.write().await;
        let removed = [key(uid_a, uid_b), key(uid_b, uid_a)]
            .iter()
            .filter(|k| state.likes.remove(*k).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn reset_all(&self, uid: &str) -> MatchResult<ResetSummary> {
        let mut state = self.state.write().await;

        let likes_before = state.likes.len();
        state
            .likes
            .retain(|(liker, liked), _| liker != uid && liked != uid);
        let passes_before = state.passes.len();
        state.passes.retain(|(user, _), _| user != uid);

        Ok(ResetSummary {
            deleted_matches: (likes_before - state.likes.len()) as u64,
            deleted_passes: (passes_before - state.passes.len()) as u64,
        })
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryStore {
    async fn get_cards(&self, uids: &[String]) -> MatchResult<Vec<ProfileCard>> {
        let state = self.state.read().await;
        Ok(uids
            .iter()
            .filter_map(|uid| state.cards.get(uid).cloned())
            .collect())
    }
}
