use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::{Validate, ValidationError};
use crate::models::domain::{AgeRange, BudgetRange, CandidateFilters, Gender};

/// Create-or-replace body for a matching preference
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_budget_order"))]
pub struct UpsertPreferenceRequest {
    #[validate(range(min = 16, max = 120))]
    pub age: i32,
    pub gender: Gender,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lifestyles: BTreeSet<String>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[validate(length(max = 200), custom(function = "validate_location"))]
    pub location: String,
    #[validate(range(min = 0.0))]
    #[serde(rename = "minBudget")]
    pub min_budget: f64,
    #[validate(range(min = 0.0))]
    #[serde(rename = "maxBudget")]
    pub max_budget: f64,
    #[serde(default)]
    pub completed: bool,
}

fn validate_location(location: &str) -> Result<(), ValidationError> {
    if location.trim().is_empty() {
        return Err(ValidationError::new("location_blank"));
    }
    Ok(())
}

fn validate_budget_order(req: &UpsertPreferenceRequest) -> Result<(), ValidationError> {
    if !req.min_budget.is_finite() || !req.max_budget.is_finite() {
        return Err(ValidationError::new("budget_not_finite"));
    }
    if req.min_budget > req.max_budget {
        return Err(ValidationError::new("min_budget_exceeds_max_budget"));
    }
    Ok(())
}

/// Body for like and pass submissions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "target_uid", rename = "targetUid")]
    pub target_uid: String,
}

/// Candidate filters exactly as they arrive on the query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCandidateFilters {
    pub location: Option<String>,
    #[serde(rename = "minBudget")]
    pub min_budget: Option<String>,
    #[serde(rename = "maxBudget")]
    pub max_budget: Option<String>,
    pub gender: Option<String>,
    #[serde(rename = "minAge")]
    pub min_age: Option<String>,
    #[serde(rename = "maxAge")]
    pub max_age: Option<String>,
}

impl RawCandidateFilters {
    /// Parse into validated filters. Malformed values are dropped, not rejected.
    pub fn into_filters(self) -> CandidateFilters {
        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let budget_range = match (parse_num::<f64>(&self.min_budget), parse_num::<f64>(&self.max_budget)) {
            (Some(min), Some(max)) => BudgetRange::new(min, max),
            _ => None,
        };
        if budget_range.is_none() && (self.min_budget.is_some() || self.max_budget.is_some()) {
            tracing::debug!(
                "Ignoring malformed budget filter: min={:?}, max={:?}",
                self.min_budget,
                self.max_budget
            );
        }

        let gender = self.gender.as_deref().and_then(|g| match g.parse::<Gender>() {
            Ok(gender) => Some(gender),
            Err(e) => {
                tracing::debug!("Ignoring malformed gender filter: {}", e);
                None
            }
        });

        let age_range = match (parse_num::<i32>(&self.min_age), parse_num::<i32>(&self.max_age)) {
            (Some(min), Some(max)) => AgeRange::new(min, max),
            _ => None,
        };
        if age_range.is_none() && (self.min_age.is_some() || self.max_age.is_some()) {
            tracing::debug!(
                "Ignoring malformed age filter: min={:?}, max={:?}",
                self.min_age,
                self.max_age
            );
        }

        CandidateFilters {
            location,
            budget_range,
            gender,
            age_range,
        }
    }
}

fn parse_num<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
    value.as_deref().and_then(|v| v.trim().parse::<T>().ok())
}
