use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Gender recorded on a matching preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "non_binary",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "non_binary" | "non-binary" | "nonbinary" => Ok(Gender::NonBinary),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// A user's roommate matching profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    pub uid: String,
    pub age: i32,
    pub gender: Gender,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lifestyles: BTreeSet<String>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    pub location: String,
    #[serde(rename = "minBudget")]
    pub min_budget: f64,
    #[serde(rename = "maxBudget")]
    pub max_budget: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl UserPreference {
    pub fn budget(&self) -> BudgetRange {
        BudgetRange {
            min: self.min_budget,
            max: self.max_budget,
        }
    }
}

/// Inclusive budget interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetRange {
    pub min: f64,
    pub max: f64,
}

impl BudgetRange {
    /// Returns `None` for non-finite, negative or inverted bounds
    pub fn new(min: f64, max: f64) -> Option<Self> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return None;
        }
        Some(Self { min, max })
    }

    /// Interval intersection test
    #[inline]
    pub fn overlaps(&self, other: &BudgetRange) -> bool {
        other.min <= self.max && other.max >= self.min
    }
}

/// Inclusive age interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: i32,
    pub max: i32,
}

impl AgeRange {
    pub fn new(min: i32, max: i32) -> Option<Self> {
        if min < 0 || min > max {
            return None;
        }
        Some(Self { min, max })
    }

    #[inline]
    pub fn contains(&self, age: i32) -> bool {
        age >= self.min && age <= self.max
    }
}

/// Validated candidate filters. Every field is optional and applied independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFilters {
    pub location: Option<String>,
    pub budget_range: Option<BudgetRange>,
    pub gender: Option<Gender>,
    pub age_range: Option<AgeRange>,
}

/// Everything the store needs to pull a candidate pool for one requester
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub requester_uid: String,
    pub location: Option<String>,
    pub budget_range: Option<BudgetRange>,
    pub gender: Option<Gender>,
    pub age_range: Option<AgeRange>,
    pub exclude_uids: Vec<String>,
    pub limit: usize,
}

/// Directional like row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    #[serde(rename = "likerUid")]
    pub liker_uid: String,
    #[serde(rename = "likedUid")]
    pub liked_uid: String,
    pub mutual: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "matchedAt")]
    pub matched_at: Option<DateTime<Utc>>,
}

/// Directional pass row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    #[serde(rename = "userUid")]
    pub user_uid: String,
    #[serde(rename = "passedUid")]
    pub passed_uid: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Result of recording a like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub mutual: bool,
    /// False when the like already existed and nothing was written
    #[serde(skip)]
    pub created: bool,
}

/// A mutual match partner as seen by the owner of the list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedPartner {
    pub uid: String,
    pub matched_at: DateTime<Utc>,
}

/// Counts reported by a full reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    #[serde(rename = "deletedMatches")]
    pub deleted_matches: u64,
    #[serde(rename = "deletedPasses")]
    pub deleted_passes: u64,
}

/// Display fields owned by the profile directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCard {
    #[serde(rename = "userId")]
    pub uid: String,
    #[serde(rename = "displayName", alias = "name")]
    pub display_name: String,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

/// Match listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    pub uid: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
}
