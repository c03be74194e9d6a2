// Integration tests for the housing recommender

use housing_recommender::config::{GeocoderSettings, LlmSettings};
use housing_recommender::core::{CandidateStore, Recommender, RecommenderOptions};
use housing_recommender::models::{
    Budget, BuildingRecord, Location, RankingSource, RefinedPreferences, UserRequest,
};
use housing_recommender::services::{GeocoderClient, OpenAiClient};
use mockito::Matcher;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Five buildings: three within 5 miles of (37.7, -122.4), two outside
fn fixture_docs() -> Vec<Value> {
    vec![
        json!({
            "building_id": "mission_1",
            "title": "Mission Lofts",
            "lat": 37.705, "lon": -122.405,
            "crime_stats": {"total_incidents": 1},
            "commute_to_downtown_minutes": 20,
            "rentcast_data": [{"bedrooms": 2, "rent": 2400}]
        }),
        json!({
            "building_id": "sunset_2",
            "title": "Sunset Court",
            "lat": 37.72, "lon": -122.41,
            "crime_stats": {"total_incidents": 5},
            "commute_to_downtown_minutes": 35,
            "rentcast_data": [{"bedrooms": 1, "rent": 1900}, {"bedrooms": 2, "rent": 2500}]
        }),
        json!({
            "building_id": "bayview_3",
            "title": "Bayview Commons",
            "lat": 37.69, "lon": -122.39,
            "crime_stats": {"total_incidents": 3},
            "transit_accessibility": {"total_transit": 8},
            "pricing": "$2,000 - $3,000"
        }),
        json!({
            "building_id": "marin_4",
            "title": "Marin Heights",
            "lat": 37.9, "lon": -122.4,
            "crime_stats": {"total_incidents": 0},
            "rentcast_data": [{"bedrooms": 2, "rent": 2000}]
        }),
        json!({
            "building_id": "san_jose_5",
            "title": "Downtown SJ",
            "lat": 37.33, "lon": -121.89,
            "crime_stats": {"total_incidents": 0}
        }),
    ]
}

fn fixture_store(embeddings: HashMap<String, Vec<f32>>) -> CandidateStore {
    CandidateStore::from_parts(
        fixture_docs()
            .into_iter()
            .map(|doc| BuildingRecord::from_json("san_francisco", doc).unwrap()),
        embeddings,
    )
}

fn scenario_request() -> UserRequest {
    let mut request = UserRequest::new(Location::Coordinates { lat: 37.7, lon: -122.4 });
    request.radius_miles = Some(5.0);
    request.top_priorities = vec!["Safety".to_string(), "Commute".to_string()];
    request.budget = Some(Budget { max_rent: Some(2500.0), bedrooms: Some(2) });
    request
}

fn llm_client(base_url: String) -> OpenAiClient {
    let settings = LlmSettings {
        api_key: Some("test-key".to_string()),
        base_url,
        ..LlmSettings::default()
    };
    OpenAiClient::from_settings(&settings).unwrap().unwrap()
}

fn chat_body(content: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
}

#[tokio::test]
async fn test_integration_end_to_end_scenario() {
    let recommender = Recommender::new(fixture_store(HashMap::new()), RecommenderOptions::default());
    let result = recommender.recommend(&scenario_request()).await.unwrap();

    let mut ids: Vec<_> = result.top_candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    assert!(result
        .top_candidates
        .windows(2)
        .all(|w| w[0].total_score >= w[1].total_score));

    // The quietest in-radius building with the shortest commute leads
    assert_eq!(ids[0], "mission_1");

    ids.sort_unstable();
    assert_eq!(ids, vec!["bayview_3", "mission_1", "sunset_2"]);

    assert_eq!(result.ranking_source, RankingSource::ScoreFallback);
    assert_eq!(result.shortlist.len(), 3);
    assert_eq!(result.shortlist[0].id, "mission_1");
}

#[tokio::test]
async fn test_integration_ranking_service_picks() {
    let mut server = mockito::Server::new_async().await;
    let reply = r#"Sure! [{"id": "sunset_2", "reasons": ["Roomy units", "Quiet block"]}, {"id": "made_up"}]"#;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Regex("ID=mission_1".to_string()))
        .with_status(200)
        .with_body(chat_body(reply))
        .expect(1)
        .create_async()
        .await;

    let recommender = Recommender::new(fixture_store(HashMap::new()), RecommenderOptions::default())
        .with_llm(Some(llm_client(server.url())));
    let result = recommender.recommend(&scenario_request()).await.unwrap();

    assert_eq!(result.ranking_source, RankingSource::RankingService);
    assert_eq!(result.shortlist.len(), 3);
    assert_eq!(result.shortlist[0].id, "sunset_2");
    assert_eq!(result.shortlist[0].reasons, vec!["Roomy units", "Quiet block"]);
    assert!(result.shortlist.iter().all(|p| p.id != "made_up"));
    assert!(result.shortlist[1..].iter().all(|p| p.reasons.is_empty()));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_integration_ranking_failure_falls_back() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let recommender = Recommender::new(fixture_store(HashMap::new()), RecommenderOptions::default())
        .with_llm(Some(llm_client(server.url())));
    let result = recommender.recommend(&scenario_request()).await.unwrap();

    assert_eq!(result.ranking_source, RankingSource::ScoreFallback);
    let shortlist: Vec<_> = result.shortlist.iter().map(|p| p.id.as_str()).collect();
    let top: Vec<_> = result.top_candidates.iter().take(3).map(|c| c.id.as_str()).collect();
    assert_eq!(shortlist, top);
}

#[tokio::test]
async fn test_integration_notes_trigger_semantic_blend() {
    let mut server = mockito::Server::new_async().await;
    let embed_mock = server
        .mock("POST", "/embeddings")
        .match_body(Matcher::Regex("Additional notes: near the bay".to_string()))
        .with_status(200)
        .with_body(r#"{"data":[{"embedding":[1.0, 0.0]}]}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(chat_body("no idea"))
        .create_async()
        .await;

    let mut embeddings = HashMap::new();
    embeddings.insert("bayview_3".to_string(), vec![1.0, 0.0]);
    embeddings.insert("mission_1".to_string(), vec![0.0, 1.0]);

    let recommender = Recommender::new(fixture_store(embeddings), RecommenderOptions::default())
        .with_llm(Some(llm_client(server.url())));

    let mut request = scenario_request();
    request.top_priorities.clear();
    request.notes = Some("near the bay".to_string());

    let result = recommender.recommend(&request).await.unwrap();

    // Without priorities only the semantic share contributes
    let bayview = result.candidate("bayview_3").unwrap();
    assert!((bayview.total_score - 0.2).abs() < 1e-9);
    assert_eq!(result.top_candidates[0].id, "bayview_3");
    assert_eq!(result.candidate("mission_1").unwrap().total_score, 0.0);
    assert_eq!(result.ranking_source, RankingSource::ScoreFallback);
    embed_mock.assert_async().await;
}

#[tokio::test]
async fn test_integration_place_name_is_geocoded() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/geo/search")
        .match_query(Matcher::UrlEncoded("q".into(), "Glen Park".into()))
        .with_status(200)
        .with_body(r#"{"top":{"lat":37.7,"lon":-122.4}}"#)
        .create_async()
        .await;

    let geocoder = GeocoderClient::new(
        format!("{}/api/geo/search", server.url()),
        &GeocoderSettings::default(),
    )
    .unwrap();
    let recommender = Recommender::new(fixture_store(HashMap::new()), RecommenderOptions::default())
        .with_geocoder(Some(geocoder));

    let mut request = scenario_request();
    request.location = Location::Place("Glen Park".to_string());
    request.budget = None;

    let result = recommender.recommend(&request).await.unwrap();
    assert_eq!(result.top_candidates.len(), 3);
    assert!(result.candidate("marin_4").is_none());
}

#[tokio::test]
async fn test_integration_refine_uses_larger_pool() {
    let mut server = mockito::Server::new_async().await;
    let chat = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("REFINED PREFERENCES: Required amenities: Gym".to_string()))
        .with_status(200)
        .with_body(chat_body("bayview_3, mission_1"))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/embeddings")
        .with_status(503)
        .create_async()
        .await;

    let options = RecommenderOptions {
        top_n: 1,
        ..RecommenderOptions::default()
    };
    let recommender = Recommender::new(fixture_store(HashMap::new()), options)
        .with_llm(Some(llm_client(server.url())));

    let refined = RefinedPreferences {
        amenities: vec!["Gym".to_string()],
        ..RefinedPreferences::default()
    };
    let result = recommender.refine(&scenario_request(), &refined).await.unwrap();

    assert_eq!(result.top_candidates.len(), 3);
    assert_eq!(result.ranking_source, RankingSource::RankingService);
    let ids: Vec<_> = result.shortlist.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["bayview_3", "mission_1", "sunset_2"]);
    chat.assert_async().await;
}
