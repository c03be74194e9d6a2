// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BuildingRecord, FinalPick, Pricing, RankingSource, RecommendationResult, RecordError,
    ScoredCandidate, Tag, TagScores, UnitRent,
};
pub use requests::{
    Budget, LayoutRequirements, Location, Questionnaire, RefineRequest, RefinedPreferences,
    Timeline, UserRequest,
};
pub use responses::{
    shortlist_views, CandidateSummary, ErrorResponse, HealthResponse, RecommendResponse, RecommendationView,
    RefineResponse,
};
