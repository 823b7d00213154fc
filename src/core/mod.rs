// Core matching exports
pub mod filters;
pub mod resolver;
pub mod selector;
pub mod service;

pub use filters::{budget_overlaps, effective_filters, matches_candidate_query, matches_filters};
pub use resolver::build_match_views;
pub use selector::{CandidateSelector, DEFAULT_CANDIDATE_LIMIT};
pub use service::MatchService;
