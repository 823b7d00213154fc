//! Storage seams between the matching core and its backends.
//!
//! Both the PostgreSQL store and the in-memory store implement these traits.
//! Implementations must make `record_like` atomic: the reverse-row lookup,
//! the insert and the reverse flag flip either all happen or none do.

use async_trait::async_trait;
use crate::error::MatchResult;
use crate::models::{
    CandidateQuery, Like, LikeOutcome, MatchedPartner, ProfileCard, ResetSummary, UserPreference,
};

/// Matching preference persistence
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Create or replace the preference, stamping `updated_at`
    async fn upsert_preference(&self, preference: UserPreference) -> MatchResult<UserPreference>;

    async fn get_preference(&self, uid: &str) -> MatchResult<Option<UserPreference>>;

    /// Batch lookup; missing uids are silently skipped
    async fn get_preferences(&self, uids: &[String]) -> MatchResult<Vec<UserPreference>>;

    /// Returns true if a row was removed
    async fn delete_preference(&self, uid: &str) -> MatchResult<bool>;

    /// Pull a random pool of completed preferences satisfying the query
    async fn query_candidates(&self, query: &CandidateQuery) -> MatchResult<Vec<UserPreference>>;

    async fn health_check(&self) -> MatchResult<bool>;

    /// Release pooled resources
    async fn close(&self) {}
}

/// Like/pass ledger with reciprocity detection
#[async_trait]
pub trait InterestLedger: Send + Sync {
    /// Insert Like(liker -> liked), flipping the reverse row to mutual when present.
    /// A repeated like returns the stored flag and writes nothing.
    async fn record_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<LikeOutcome>;

    /// Returns true if a new row was written
    async fn record_pass(&self, user_uid: &str, passed_uid: &str) -> MatchResult<bool>;

    async fn get_like(&self, liker_uid: &str, liked_uid: &str) -> MatchResult<Option<Like>>;

    /// Every uid the user has liked or passed
    async fn excluded_uids(&self, uid: &str) -> MatchResult<Vec<String>>;

    /// Mutual partners, most recent match first
    async fn list_mutual(&self, uid: &str) -> MatchResult<Vec<MatchedPartner>>;

    /// Delete both directional like rows; returns rows removed
    async fn delete_pair(&self, uid_a: &str, uid_b: &str) -> MatchResult<u64>;

    /// Delete every like touching uid and every pass authored by uid
    async fn reset_all(&self, uid: &str) -> MatchResult<ResetSummary>;
}

/// Display-field lookup for match enrichment
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_cards(&self, uids: &[String]) -> MatchResult<Vec<ProfileCard>>;
}

/// Lock key for the unordered pair, identical for (a, b) and (b, a)
pub fn pair_lock_key(uid_a: &str, uid_b: &str) -> String {
    if uid_a <= uid_b {
        format!("{}:{}", uid_a, uid_b)
    } else {
        format!("{}:{}", uid_b, uid_a)
    }
}
