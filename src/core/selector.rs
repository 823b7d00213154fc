use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::core::filters::{effective_filters, matches_candidate_query};
use crate::models::{CandidateFilters, CandidateQuery, UserPreference};

/// Default sample size for a candidates request
pub const DEFAULT_CANDIDATE_LIMIT: usize = 50;

/// Candidate selection pipeline
///
/// # Pipeline Stages
/// 1. Build the query: requester exclusions plus effective filters
/// 2. Store pre-filter (pushed down to the backend)
/// 3. In-process re-check of every predicate
/// 4. Random sample capped at `limit`
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    limit: usize,
    default_budget_overlap: bool,
}

impl CandidateSelector {
    pub fn new(limit: usize, default_budget_overlap: bool) -> Self {
        Self {
            limit: limit.max(1),
            default_budget_overlap,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Build the store query for a requester
    pub fn build_query(
        &self,
        requester: &UserPreference,
        filters: &CandidateFilters,
        exclude_uids: Vec<String>,
    ) -> CandidateQuery {
        let filters = effective_filters(requester, filters, self.default_budget_overlap);
        CandidateQuery::new(&requester.uid, filters, exclude_uids, self.limit)
    }

    /// Re-check the pool against the query and draw the final sample
    pub fn select(&self, query: &CandidateQuery, pool: Vec<UserPreference>) -> Vec<UserPreference> {
        self.select_with_rng(query, pool, &mut rand::rng())
    }

    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        query: &CandidateQuery,
        pool: Vec<UserPreference>,
        rng: &mut R,
    ) -> Vec<UserPreference> {
        let pool_size = pool.len();

        let mut eligible: Vec<UserPreference> = pool
            .into_iter()
            .filter(|candidate| matches_candidate_query(candidate, query))
            .collect();

        if eligible.len() < pool_size {
            tracing::debug!(
                "Dropped {} pooled candidates failing re-check for {}",
                pool_size - eligible.len(),
                query.requester_uid
            );
        }

        let mut seen = HashSet::with_capacity(eligible.len());
        eligible.retain(|candidate| seen.insert(candidate.uid.clone()));
        eligible.shuffle(rng);
        eligible.truncate(self.limit);
        eligible
    }
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATE_LIMIT, true)
    }
}
