// Unit tests for the housing recommender

use housing_recommender::core::{
    distance::{bbox_thresholds, haversine_distance, is_within_radius, lon_diff_deg},
    filters::matches_budget,
    ranking::{fallback_shortlist, parse_ranking_output},
    scoring::{rank_top_n, score_candidates, PriorityWeights},
};
use housing_recommender::models::BuildingRecord;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn building(id: &str, extra: Value) -> Arc<BuildingRecord> {
    let mut doc = extra;
    doc["building_id"] = json!(id);
    Arc::new(BuildingRecord::from_json("san_francisco", doc).unwrap())
}

#[test]
fn test_haversine_distance_zero() {
    for lat in [-89.5, -45.0, 0.0, 37.7, 89.5] {
        for lon in [-180.0, -122.4, 0.0, 90.0, 180.0] {
            assert!(haversine_distance(lat, lon, lat, lon).abs() < 1e-9);
        }
    }
}

#[test]
fn test_lon_diff_symmetric_and_bounded() {
    let samples = [-180.0, -179.0, -120.5, -1.0, 0.0, 45.0, 179.0, 180.0];
    for &x in &samples {
        for &y in &samples {
            let d = lon_diff_deg(x, y);
            assert!((d - lon_diff_deg(y, x)).abs() < 1e-9);
            assert!((0.0..=180.0).contains(&d), "{} -> {} gave {}", x, y, d);
        }
    }
    assert!((lon_diff_deg(179.0, -179.0) - 2.0).abs() < 1e-9);
}

#[test]
fn test_two_stage_radius_has_no_false_negatives() {
    let centers = [(37.7, -122.4), (0.0, 179.9), (-33.9, 151.2), (70.0, 20.0), (85.0, -179.5)];
    let radii = [0.5, 5.0, 50.0];

    for &(lat, lon) in &centers {
        for &radius in &radii {
            let (dlat, dlon) = bbox_thresholds(lat, radius);
            for i in -10..=10 {
                for j in -10..=10 {
                    let p_lat = (lat + dlat * i as f64 / 10.0).clamp(-90.0, 90.0);
                    let mut p_lon = lon + dlon * j as f64 / 10.0;
                    if p_lon > 180.0 {
                        p_lon -= 360.0;
                    } else if p_lon < -180.0 {
                        p_lon += 360.0;
                    }
                    if haversine_distance(lat, lon, p_lat, p_lon) <= radius {
                        assert!(
                            is_within_radius(lat, lon, p_lat, p_lon, radius),
                            "missed ({}, {}) around ({}, {}) r={}",
                            p_lat,
                            p_lon,
                            lat,
                            lon,
                            radius
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_budget_gate_properties() {
    let exact = building("exact", json!({"rentcast_data": [{"bedrooms": 2, "rent": 2500}]}));
    let over = building("over", json!({"rentcast_data": [{"bedrooms": 2, "rent": 2501}, {"bedrooms": 2, "rent": 3100}]}));
    let unknown = building("unknown", json!({}));

    assert!(matches_budget(&exact, 2500.0, Some(2)));
    assert!(!matches_budget(&over, 2500.0, Some(2)));
    assert!(matches_budget(&unknown, 2500.0, Some(2)));
    assert!(matches_budget(&unknown, 0.0, None));
}

#[test]
fn test_priority_weight_decay() {
    let weights = PriorityWeights::from_priorities(&["Safety", "Commute"]);
    assert_eq!(weights.get("Safety"), Some(1.0));
    assert_eq!(weights.get("Commute"), Some(0.8));

    let six = PriorityWeights::from_priorities(&[
        "Safety", "Commute", "Public Transit", "Near Grocery", "Car Friendly", "Pet Friendly",
    ]);
    assert_eq!(six.get("Car Friendly"), Some(0.2));
    assert_eq!(six.get("Pet Friendly"), None);
}

#[test]
fn test_incident_normalization() {
    let buildings = vec![
        building("quiet", json!({"crime_stats": {"total_incidents": 0}})),
        building("loud", json!({"crime_stats": {"total_incidents": 10}})),
    ];
    let scored = score_candidates(&buildings, &PriorityWeights::from_priorities(&["Safety"]), None);
    assert_eq!(scored[0].tag_scores.safety, 1.0);
    assert_eq!(scored[1].tag_scores.safety, 0.0);
}

#[test]
fn test_ranking_parse_round_trip() {
    let known: HashSet<&str> = ["b1", "b2", "b3"].into_iter().collect();
    let reply = json!([
        {"id": "b1", "reasons": ["Safe block", "Short commute", "In budget"]},
        {"id": "b2", "reasons": ["Near groceries"]},
        {"id": "b3", "reasons": []}
    ])
    .to_string();

    let picks = parse_ranking_output(&reply, &known);
    let ids: Vec<_> = picks.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["b1", "b2", "b3"]);
    assert_eq!(picks[0].reasons.len(), 3);
    assert_eq!(picks[1].reasons, vec!["Near groceries"]);
}

#[test]
fn test_ranking_parse_truncates_to_three() {
    let known: HashSet<&str> = ["a", "b", "c", "d", "e"].into_iter().collect();
    let reply = r#"[{"id":"e"},{"id":"d"},{"id":"c"},{"id":"b"},{"id":"a"}]"#;
    assert_eq!(parse_ranking_output(reply, &known).len(), 3);
}

#[test]
fn test_garbled_reply_falls_back_to_scores() {
    let buildings: Vec<_> = (0..5)
        .map(|i| building(&format!("b{}", i), json!({"crime_stats": {"total_incidents": i}})))
        .collect();
    let top = rank_top_n(
        score_candidates(&buildings, &PriorityWeights::from_priorities(&["Safety"]), None),
        20,
    );
    let known: HashSet<&str> = top.iter().map(|c| c.id.as_str()).collect();

    for reply in ["", "???", "[{\"oops\": true}]", "Sorry, I can't rank these."] {
        assert!(parse_ranking_output(reply, &known).is_empty(), "reply {:?}", reply);
    }

    let fallback = fallback_shortlist(&top);
    let ids: Vec<_> = fallback.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["b0", "b1", "b2"]);
    assert!(fallback.iter().all(|p| p.reasons.is_empty()));
}
