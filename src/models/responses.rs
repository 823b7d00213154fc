use serde::{Deserialize, Serialize};
use crate::models::domain::{MatchView, UserPreference};

/// Response for the candidates endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesResponse {
    pub candidates: Vec<UserPreference>,
    pub count: usize,
}

/// Response for the like endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub mutual: bool,
}

/// Response for the matches listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchView>,
    pub count: usize,
}

/// Response for a pairwise match check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckMatchResponse {
    #[serde(rename = "otherUid")]
    pub other_uid: String,
    pub matched: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}
