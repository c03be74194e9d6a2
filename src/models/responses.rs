use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::models::domain::{RankingSource, RecommendationResult, ScoredCandidate, TagScores};

/// Shortlisted building joined with its scoring details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationView {
    pub building_id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub county: String,
    pub score: f64,
    pub tag_scores: TagScores,
    pub data: Map<String, Value>,
    pub reasons: Vec<String>,
}

/// Compact top-N entry for list display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub building_id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub county: String,
    pub score: f64,
}

impl From<&ScoredCandidate> for CandidateSummary {
    fn from(c: &ScoredCandidate) -> Self {
        Self {
            building_id: c.id.clone(),
            name: c.name.clone(),
            address: c.address.clone(),
            county: c.region.clone(),
            score: c.total_score,
        }
    }
}

/// Response for the recommend endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub request_id: uuid::Uuid,
    pub ranking_source: RankingSource,
    pub recommendations: Vec<RecommendationView>,
    pub candidates: Vec<CandidateSummary>,
}

impl From<&RecommendationResult> for RecommendResponse {
    fn from(result: &RecommendationResult) -> Self {
        Self {
            success: true,
            request_id: result.request_id,
            ranking_source: result.ranking_source,
            recommendations: shortlist_views(result),
            candidates: result.top_candidates.iter().map(CandidateSummary::from).collect(),
        }
    }
}

/// Response for the refinement endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineResponse {
    pub success: bool,
    pub request_id: uuid::Uuid,
    pub ranking_source: RankingSource,
    pub recommendations: Vec<RecommendationView>,
    pub candidate_count: usize,
    pub refined_preferences: crate::models::RefinedPreferences,
}

/// Join shortlist ids with their top-N entries; ids missing from the list are skipped
pub fn shortlist_views(result: &RecommendationResult) -> Vec<RecommendationView> {
    result
        .shortlist
        .iter()
        .filter_map(|pick| {
            let candidate = result.candidate(&pick.id)?;
            Some(RecommendationView {
                building_id: candidate.id.clone(),
                name: candidate.name.clone(),
                address: candidate.address.clone(),
                county: candidate.region.clone(),
                score: candidate.total_score,
                tag_scores: candidate.tag_scores,
                data: candidate.building.attributes.clone(),
                reasons: pick.reasons.clone(),
            })
        })
        .collect()
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub buildings: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
