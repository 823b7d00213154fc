// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AgeRange, BudgetRange, CandidateFilters, CandidateQuery, Gender, Like, LikeOutcome,
    MatchView, MatchedPartner, Pass, ProfileCard, ResetSummary, UserPreference,
};
pub use requests::{RawCandidateFilters, TargetRequest, UpsertPreferenceRequest};
pub use responses::{
    CandidatesResponse, CheckMatchResponse, ErrorResponse, HealthResponse, LikeResponse,
    MatchesResponse,
};
