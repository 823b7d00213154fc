//! Roommate Match - roommate matching core for the housing marketplace
//!
//! Computes eligible candidates for a user, records like/pass signals,
//! resolves mutual matches atomically and supports unmatch/reset.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{CandidateSelector, MatchService};
pub use error::{MatchError, MatchResult};
pub use models::{CandidateFilters, Gender, LikeOutcome, MatchView, ResetSummary, UserPreference};
