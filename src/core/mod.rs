// Core algorithm exports
pub mod distance;
pub mod filters;
pub mod prompts;
pub mod ranking;
pub mod recommender;
pub mod scoring;
pub mod store;

pub use distance::{haversine_distance, is_within_radius};
pub use filters::{filter_by_budget, filter_by_location, LocationGate, RegionBounds};
pub use ranking::{parse_ranking_output, select_shortlist};
pub use recommender::{RecommendError, Recommender, RecommenderOptions};
pub use scoring::{rank_top_n, score_candidates, PriorityWeights};
pub use store::CandidateStore;
