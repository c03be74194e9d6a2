use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::core::{
    filters::{filter_by_budget, filter_by_location, LocationGate, RegionBounds},
    ranking::select_shortlist,
    scoring::{build_query_text, rank_top_n, score_candidates, PriorityWeights},
    store::CandidateStore,
};
use crate::models::{
    Location, RankingSource, RecommendationResult, RefinedPreferences, UserRequest,
};
use crate::services::{GeocoderClient, OpenAiClient};

/// Errors surfaced to callers of the recommender
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("No buildings are loaded")]
    NoCandidates,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<validator::ValidationErrors> for RecommendError {
    fn from(errors: validator::ValidationErrors) -> Self {
        RecommendError::InvalidRequest(errors.to_string())
    }
}

/// Tunables for a recommender instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommenderOptions {
    pub region_bounds: RegionBounds,
    /// Size of the top-N handed to the ranking service
    pub top_n: usize,
    /// Top-N size for the refine flow
    pub refine_top_n: usize,
}

impl Default for RecommenderOptions {
    fn default() -> Self {
        Self {
            region_bounds: RegionBounds::BAY_AREA,
            top_n: 20,
            refine_top_n: 40,
        }
    }
}

/// Recommendation orchestrator
///
/// # Pipeline Stages
/// 1. Location-radius gate (geocoding place names first)
/// 2. Budget gate with room coupling
/// 3. Priority scoring, blended with semantic similarity when notes are given
/// 4. Top-N selection
/// 5. Shortlist from the ranking service, or score order as fallback
///
/// The store is an immutable snapshot; requests clone the `Arc` and never
/// block a concurrent [`Recommender::replace_store`].
pub struct Recommender {
    store: RwLock<Arc<CandidateStore>>,
    geocoder: Option<GeocoderClient>,
    llm: Option<OpenAiClient>,
    options: RecommenderOptions,
}

impl Recommender {
    pub fn new(store: CandidateStore, options: RecommenderOptions) -> Self {
        Self {
            store: RwLock::new(Arc::new(store)),
            geocoder: None,
            llm: None,
            options,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Option<GeocoderClient>) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn with_llm(mut self, llm: Option<OpenAiClient>) -> Self {
        self.llm = llm;
        self
    }

    pub fn options(&self) -> &RecommenderOptions {
        &self.options
    }

    /// Current store snapshot
    pub fn snapshot(&self) -> Arc<CandidateStore> {
        self.store.read().clone()
    }

    /// Swap in a freshly loaded store; in-flight requests keep their snapshot
    pub fn replace_store(&self, store: CandidateStore) {
        let store = Arc::new(store);
        tracing::info!("Replacing candidate store ({} buildings)", store.len());
        *self.store.write() = store;
    }

    /// Run the pipeline with the configured top-N size
    pub async fn recommend(&self, request: &UserRequest) -> Result<RecommendationResult, RecommendError> {
        self.recommend_with_limit(request, self.options.top_n).await
    }

    /// Run the pipeline keeping `top_n` candidates for ranking
    pub async fn recommend_with_limit(
        &self,
        request: &UserRequest,
        top_n: usize,
    ) -> Result<RecommendationResult, RecommendError> {
        request.validate()?;

        let store = self.snapshot();
        if store.is_empty() {
            return Err(RecommendError::NoCandidates);
        }

        let request_id = Uuid::new_v4();
        tracing::info!(%request_id, "Recommending from {} buildings", store.len());

        let resolved = self.resolve_location(&request.location).await;
        let radius = request.effective_radius();
        let (nearby, gate) =
            filter_by_location(store.buildings(), resolved, radius, &self.options.region_bounds);
        match gate {
            LocationGate::Filtered { center } => tracing::debug!(
                %request_id,
                "{} buildings within {} mi of ({:.4}, {:.4})",
                nearby.len(),
                radius,
                center.0,
                center.1
            ),
            LocationGate::Unresolved => {
                tracing::warn!(%request_id, "Location could not be resolved, skipping radius filter")
            }
            LocationGate::OutOfRegion { center } => tracing::warn!(
                %request_id,
                "Resolved location ({:.4}, {:.4}) is outside the service region, skipping radius filter",
                center.0,
                center.1
            ),
        }

        let affordable = filter_by_budget(nearby, request.budget.as_ref());
        tracing::debug!(%request_id, "{} buildings after budget filter", affordable.len());

        if affordable.is_empty() {
            tracing::info!(%request_id, "No buildings survived filtering");
            return Ok(RecommendationResult {
                request_id,
                top_candidates: Vec::new(),
                shortlist: Vec::new(),
                ranking_source: RankingSource::ScoreFallback,
            });
        }

        let weights = PriorityWeights::from_priorities(&request.top_priorities);
        let query_embedding = self.embed_query(request).await;

        let scored = score_candidates(&affordable, &weights, query_embedding.as_deref());
        let top_candidates = rank_top_n(scored, top_n);

        let (shortlist, ranking_source) = select_shortlist(
            self.llm.as_ref(),
            request,
            resolved,
            &weights,
            &top_candidates,
        )
        .await;

        tracing::info!(
            %request_id,
            "Shortlisted {} of {} candidates ({:?})",
            shortlist.len(),
            top_candidates.len(),
            ranking_source
        );

        Ok(RecommendationResult {
            request_id,
            top_candidates,
            shortlist,
            ranking_source,
        })
    }

    /// Re-run the pipeline with follow-up preferences folded into the notes
    pub async fn refine(
        &self,
        request: &UserRequest,
        refined: &RefinedPreferences,
    ) -> Result<RecommendationResult, RecommendError> {
        let request = request.with_refinement(refined);
        self.recommend_with_limit(&request, self.options.refine_top_n).await
    }

    async fn resolve_location(&self, location: &Location) -> Option<(f64, f64)> {
        match location {
            Location::Coordinates { lat, lon } => Some((*lat, *lon)),
            Location::Place(name) => {
                let geocoder = self.geocoder.as_ref()?;
                match geocoder.geocode(name).await {
                    Ok(point) => point,
                    Err(e) => {
                        tracing::warn!("Geocoding '{}' failed: {}", name, e);
                        None
                    }
                }
            }
        }
    }

    /// Query embedding from the request text; only computed when notes are present
    async fn embed_query(&self, request: &UserRequest) -> Option<Vec<f32>> {
        request.notes_text()?;
        let llm = self.llm.as_ref()?;

        match llm.embed(&build_query_text(request)).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::warn!("Query embedding failed ({}), scoring without semantic blend", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuildingRecord, Budget};
    use serde_json::json;
    use std::collections::HashMap;

    fn store() -> CandidateStore {
        let docs = vec![
            json!({"building_id": "a", "lat": 37.71, "lon": -122.41, "crime_stats": {"total_incidents": 2}}),
            json!({"building_id": "b", "lat": 37.72, "lon": -122.40, "crime_stats": {"total_incidents": 8}}),
            json!({"building_id": "far", "lat": 38.5, "lon": -122.4}),
        ];
        CandidateStore::from_parts(
            docs.into_iter().map(|d| BuildingRecord::from_json("sf", d).unwrap()),
            HashMap::new(),
        )
    }

    fn request() -> UserRequest {
        let mut request = UserRequest::new(Location::Coordinates { lat: 37.7, lon: -122.4 });
        request.top_priorities = vec!["Safety".to_string()];
        request
    }

    #[tokio::test]
    async fn test_recommend_without_services() {
        let recommender = Recommender::new(store(), RecommenderOptions::default());
        let result = recommender.recommend(&request()).await.unwrap();

        assert_eq!(result.ranking_source, RankingSource::ScoreFallback);
        let ids: Vec<_> = result.top_candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(result.shortlist.len(), 2);
        assert_eq!(result.shortlist[0].id, "a");
    }

    #[tokio::test]
    async fn test_empty_store_is_an_error() {
        let recommender = Recommender::new(CandidateStore::default(), RecommenderOptions::default());
        assert!(matches!(
            recommender.recommend(&request()).await,
            Err(RecommendError::NoCandidates)
        ));
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let recommender = Recommender::new(store(), RecommenderOptions::default());
        let mut bad = request();
        bad.location = Location::Coordinates { lat: 120.0, lon: 0.0 };
        assert!(matches!(
            recommender.recommend(&bad).await,
            Err(RecommendError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_nothing_affordable_is_empty_result() {
        let recommender = Recommender::new(store(), RecommenderOptions::default());
        let mut req = request();
        req.budget = Some(Budget { max_rent: Some(1000.0), bedrooms: Some(2) });

        // Buildings without pricing pass the budget gate, so the result is non-empty
        let result = recommender.recommend(&req).await.unwrap();
        assert_eq!(result.top_candidates.len(), 2);

        recommender.replace_store(CandidateStore::from_parts(
            vec![BuildingRecord::from_json(
                "sf",
                json!({"building_id": "pricey", "lat": 37.7, "lon": -122.4,
                       "rentcast_data": [{"bedrooms": 2, "rent": 4000}]}),
            )
            .unwrap()],
            HashMap::new(),
        ));
        let result = recommender.recommend(&req).await.unwrap();
        assert!(result.top_candidates.is_empty());
        assert!(result.shortlist.is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_place_skips_radius_filter() {
        let recommender = Recommender::new(store(), RecommenderOptions::default());
        let mut req = request();
        req.location = Location::Place("Somewhere".to_string());

        let result = recommender.recommend(&req).await.unwrap();
        assert_eq!(result.top_candidates.len(), 3);
    }

    #[test]
    fn test_replace_store_keeps_old_snapshot() {
        let recommender = Recommender::new(store(), RecommenderOptions::default());
        let before = recommender.snapshot();
        recommender.replace_store(CandidateStore::default());
        assert_eq!(before.len(), 3);
        assert!(recommender.snapshot().is_empty());
    }
}
