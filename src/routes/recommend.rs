use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::core::{RecommendError, Recommender};
use crate::models::{
    shortlist_views, ErrorResponse, HealthResponse, Questionnaire, RecommendResponse,
    RefineRequest, RefineResponse, UserRequest,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

/// Configure recommendation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/recommend", web::post().to(recommend))
        .route("/recommend/refine", web::post().to(refine));
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let buildings = state.recommender.snapshot().len();
    let status = if buildings > 0 { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        buildings,
        timestamp: chrono::Utc::now(),
    })
}

fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

fn error_response(e: RecommendError) -> HttpResponse {
    match &e {
        RecommendError::InvalidRequest(message) => bad_request("Validation failed", message.clone()),
        RecommendError::NoCandidates => {
            tracing::error!("Recommendation requested with an empty building store");
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "No buildings loaded".to_string(),
                message: e.to_string(),
                status_code: 503,
            })
        }
    }
}

/// Recommend endpoint
///
/// POST /api/ai/recommend
///
/// Request body: the housing questionnaire
/// ```json
/// {
///   "location": {"address": "San Mateo, CA", "radius": 5},
///   "budget": {"min": 1500, "max": 2500},
///   "priorities": ["Safety", "Commute"],
///   "bedrooms": [2],
///   "notes": "quiet street"
/// }
/// ```
async fn recommend(state: web::Data<AppState>, body: web::Json<Questionnaire>) -> impl Responder {
    let request = match UserRequest::try_from(body.into_inner()) {
        Ok(request) => request,
        Err(message) => {
            tracing::info!("Rejected questionnaire: {}", message);
            return bad_request("Invalid questionnaire", message);
        }
    };

    match state.recommender.recommend(&request).await {
        Ok(result) => HttpResponse::Ok().json(RecommendResponse::from(&result)),
        Err(e) => error_response(e),
    }
}

/// Refine endpoint
///
/// POST /api/ai/recommend/refine
///
/// Takes the questionnaire fields plus a `refined` object with follow-up
/// preferences (amenities, commute destination, extra notes).
async fn refine(state: web::Data<AppState>, body: web::Json<RefineRequest>) -> impl Responder {
    let RefineRequest {
        questionnaire,
        refined,
        ..
    } = body.into_inner();

    let request = match UserRequest::try_from(questionnaire) {
        Ok(request) => request,
        Err(message) => return bad_request("Invalid questionnaire", message),
    };

    tracing::info!("Refining recommendations: {:?}", refined.summary());

    match state.recommender.refine(&request, &refined).await {
        Ok(result) => HttpResponse::Ok().json(RefineResponse {
            success: true,
            request_id: result.request_id,
            ranking_source: result.ranking_source,
            recommendations: shortlist_views(&result),
            candidate_count: result.top_candidates.len(),
            refined_preferences: refined,
        }),
        Err(e) => error_response(e),
    }
}
