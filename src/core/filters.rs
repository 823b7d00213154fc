use crate::models::{BudgetRange, CandidateFilters, CandidateQuery, UserPreference};

/// Check if a candidate passes the optional filters
///
/// Absent filters always pass.
#[inline]
pub fn matches_filters(candidate: &UserPreference, filters: &CandidateFilters) -> bool {
    if let Some(location) = &filters.location {
        if &candidate.location != location {
            return false;
        }
    }

    if let Some(range) = &filters.budget_range {
        if !budget_overlaps(candidate, range) {
            return false;
        }
    }

    if let Some(gender) = filters.gender {
        if candidate.gender != gender {
            return false;
        }
    }

    if let Some(ages) = &filters.age_range {
        if !ages.contains(candidate.age) {
            return false;
        }
    }

    true
}

/// Candidate budget intersects the given range
#[inline]
pub fn budget_overlaps(candidate: &UserPreference, range: &BudgetRange) -> bool {
    range.overlaps(&candidate.budget())
}

/// Check a candidate against the full query, mandatory exclusions included
#[inline]
pub fn matches_candidate_query(candidate: &UserPreference, query: &CandidateQuery) -> bool {
    // Only completed profiles are eligible
    if !candidate.completed {
        return false;
    }

    // Never show the requester to themselves
    if candidate.uid == query.requester_uid {
        return false;
    }

    // Already liked or passed
    if query.exclude_uids.contains(&candidate.uid) {
        return false;
    }

    matches_filters(candidate, &query.filters())
}

/// Resolve the filters actually applied for a requester
///
/// Without an explicit budget filter the requester's own budget is used when
/// `default_budget_overlap` is set.
pub fn effective_filters(
    requester: &UserPreference,
    filters: &CandidateFilters,
    default_budget_overlap: bool,
) -> CandidateFilters {
    let mut effective = filters.clone();
    if effective.budget_range.is_none() && default_budget_overlap {
        effective.budget_range = Some(requester.budget());
    }
    effective
}

impl CandidateQuery {
    pub fn new(
        requester_uid: &str,
        filters: CandidateFilters,
        exclude_uids: Vec<String>,
        limit: usize,
    ) -> Self {
        Self {
            requester_uid: requester_uid.to_string(),
            location: filters.location,
            budget_range: filters.budget_range,
            gender: filters.gender,
            age_range: filters.age_range,
            exclude_uids,
            limit,
        }
    }

    pub fn filters(&self) -> CandidateFilters {
        CandidateFilters {
            location: self.location.clone(),
            budget_range: self.budget_range,
            gender: self.gender,
            age_range: self.age_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgeRange, Gender};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn create_preference(uid: &str, location: &str, min: f64, max: f64) -> UserPreference {
        UserPreference {
            uid: uid.to_string(),
            age: 25,
            gender: Gender::Female,
            description: String::new(),
            lifestyles: BTreeSet::new(),
            interests: BTreeSet::new(),
            location: location.to_string(),
            min_budget: min,
            max_budget: max,
            completed: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_budget_overlap_rule() {
        let requester = BudgetRange::new(100.0, 500.0).unwrap();
        let far = create_preference("far", "Phnom Penh", 600.0, 800.0);
        let overlapping = create_preference("near", "Phnom Penh", 400.0, 900.0);

        assert!(!budget_overlaps(&far, &requester));
        assert!(budget_overlaps(&overlapping, &requester));
    }

    #[test]
    fn test_location_is_exact_match() {
        let candidate = create_preference("c", "Siem Reap", 100.0, 300.0);
        let filters = CandidateFilters {
            location: Some("Phnom Penh".to_string()),
            ..Default::default()
        };
        assert!(!matches_filters(&candidate, &filters));
    }

    #[test]
    fn test_age_range_inclusive() {
        let candidate = create_preference("c", "Phnom Penh", 100.0, 300.0);
        let filters = CandidateFilters {
            age_range: AgeRange::new(25, 25),
            ..Default::default()
        };
        assert!(matches_filters(&candidate, &filters));
    }

    #[test]
    fn test_gender_filter() {
        let candidate = create_preference("c", "Phnom Penh", 100.0, 300.0);
        let filters = CandidateFilters {
            gender: Some(Gender::Male),
            ..Default::default()
        };
        assert!(!matches_filters(&candidate, &filters));
    }

    #[test]
    fn test_mandatory_exclusions() {
        let query = CandidateQuery::new("me", CandidateFilters::default(), vec!["seen".into()], 50);

        let me = create_preference("me", "Phnom Penh", 100.0, 300.0);
        let seen = create_preference("seen", "Phnom Penh", 100.0, 300.0);
        let mut draft = create_preference("draft", "Phnom Penh", 100.0, 300.0);
        draft.completed = false;
        let fresh = create_preference("fresh", "Phnom Penh", 100.0, 300.0);

        assert!(!matches_candidate_query(&me, &query));
        assert!(!matches_candidate_query(&seen, &query));
        assert!(!matches_candidate_query(&draft, &query));
        assert!(matches_candidate_query(&fresh, &query));
    }

    #[test]
    fn test_effective_filters_default_to_requester_budget() {
        let requester = create_preference("me", "Phnom Penh", 100.0, 300.0);

        let effective = effective_filters(&requester, &CandidateFilters::default(), true);
        assert_eq!(effective.budget_range, BudgetRange::new(100.0, 300.0));

        let disabled = effective_filters(&requester, &CandidateFilters::default(), false);
        assert_eq!(disabled.budget_range, None);

        let explicit = CandidateFilters {
            budget_range: BudgetRange::new(700.0, 900.0),
            ..Default::default()
        };
        let kept = effective_filters(&requester, &explicit, true);
        assert_eq!(kept.budget_range, BudgetRange::new(700.0, 900.0));
    }
}
