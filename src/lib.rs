//! Housing recommender - shortlists rental buildings for a user's preferences
//!
//! Candidates pass a location-radius gate and a budget gate, are scored
//! against the user's ranked priorities (blended with semantic similarity
//! when notes are given) and the top-N is handed to an external ranking
//! service that picks three, with a score-order fallback.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::{haversine_distance, is_within_radius},
    CandidateStore, RecommendError, Recommender, RecommenderOptions,
};
pub use models::{
    BuildingRecord, FinalPick, RankingSource, RecommendationResult, ScoredCandidate, UserRequest,
};
