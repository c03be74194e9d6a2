use std::sync::Arc;

use crate::models::{BuildingRecord, ScoredCandidate, Tag, TagScores, UserRequest};

/// Weight assigned to each accepted priority, by position
pub const PRIORITY_DECAY: [f64; 5] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Share of the structured score kept when blending in semantic similarity
pub const STRUCTURED_SHARE: f64 = 0.8;
pub const SEMANTIC_SHARE: f64 = 0.2;

/// Neutral score for a tag whose observed maximum is zero
const NEUTRAL_SCORE: f64 = 0.5;

/// Ordered tag → weight mapping derived from the user's priority list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityWeights {
    entries: Vec<(String, f64)>,
}

impl PriorityWeights {
    /// Blank and repeated tags are skipped without consuming a decay slot.
    /// Tags past the fifth accepted one get no weight.
    pub fn from_priorities<S: AsRef<str>>(priorities: &[S]) -> Self {
        let mut entries: Vec<(String, f64)> = Vec::with_capacity(PRIORITY_DECAY.len());

        for raw in priorities {
            if entries.len() == PRIORITY_DECAY.len() {
                break;
            }
            let tag = raw.as_ref().trim();
            if tag.is_empty() || entries.iter().any(|(t, _)| t.eq_ignore_ascii_case(tag)) {
                continue;
            }
            entries.push((tag.to_string(), PRIORITY_DECAY[entries.len()]));
        }

        Self { entries }
    }

    pub fn get(&self, tag: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(tag.trim()))
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(t, w)| (t.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weighted sum over the weighted tags; unknown tags contribute nothing
    pub fn total(&self, scores: &TagScores) -> f64 {
        self.iter()
            .filter_map(|(tag, weight)| tag.parse::<Tag>().ok().map(|t| weight * scores.get(t)))
            .sum()
    }
}

/// Cosine similarity; 0 for empty, zero-norm or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Maximum observed raw signals over the filtered candidate set
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalizationStats {
    pub max_incidents: f64,
    pub max_transit: f64,
    pub max_commute: f64,
    pub max_grocery: f64,
    pub max_lifestyle: f64,
    pub max_amenities: f64,
    pub max_car: f64,
}

impl NormalizationStats {
    pub fn observe<'a, I>(buildings: I) -> Self
    where
        I: IntoIterator<Item = &'a BuildingRecord>,
    {
        let mut stats = Self::default();
        for b in buildings {
            stats.max_incidents = stats.max_incidents.max(b.incident_count());
            stats.max_transit = stats.max_transit.max(b.transit_stops());
            if let Some(minutes) = b.commute_minutes().filter(|m| m.is_finite()) {
                stats.max_commute = stats.max_commute.max(minutes);
            }
            stats.max_grocery = stats.max_grocery.max(grocery_count(b));
            stats.max_lifestyle = stats.max_lifestyle.max(lifestyle_count(b));
            stats.max_amenities = stats.max_amenities.max(b.amenities().len() as f64);
            stats.max_car = stats.max_car.max(b.car_score());
        }
        stats
    }
}

fn grocery_count(b: &BuildingRecord) -> f64 {
    b.poi_count("dining") + b.poi_count("shopping")
}

fn lifestyle_count(b: &BuildingRecord) -> f64 {
    b.poi_count("entertainment") + b.poi_count("fitness")
}

/// `value / max` clamped to [0, 1], or the neutral score when `max` is zero
#[inline]
fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        NEUTRAL_SCORE
    }
}

/// Score every tag of one building against the set's maxima
pub fn calculate_tag_scores(b: &BuildingRecord, stats: &NormalizationStats) -> TagScores {
    let safety = if stats.max_incidents > 0.0 {
        1.0 - ratio(b.incident_count(), stats.max_incidents)
    } else {
        NEUTRAL_SCORE
    };

    let public_transit = ratio(b.transit_stops(), stats.max_transit);

    let commute = match b.commute_minutes() {
        None => 1.0 - public_transit,
        Some(_) if stats.max_commute <= 0.0 => NEUTRAL_SCORE,
        Some(minutes) => 1.0 - ratio(minutes, stats.max_commute),
    };

    let car = b.car_score();
    let car_friendly = if stats.max_car > 0.0 {
        ratio(car, stats.max_car)
    } else if car != 0.0 {
        (car / 100.0).clamp(0.0, 1.0)
    } else {
        NEUTRAL_SCORE
    };

    let amenities = b.amenities();
    let pet_friendly = if amenities.iter().any(|a| {
        let a = a.to_lowercase();
        a.contains("pet") || a.contains("dog") || a.contains("cat")
    }) {
        1.0
    } else {
        0.3
    };

    TagScores {
        safety,
        commute,
        public_transit,
        near_grocery: ratio(grocery_count(b), stats.max_grocery),
        car_friendly,
        lifestyle: ratio(lifestyle_count(b), stats.max_lifestyle),
        pet_friendly,
        amenities: ratio(amenities.len() as f64, stats.max_amenities),
    }
}

/// Score the filtered set, blending semantic similarity when a query embedding is given
pub fn score_candidates(
    buildings: &[Arc<BuildingRecord>],
    weights: &PriorityWeights,
    query_embedding: Option<&[f32]>,
) -> Vec<ScoredCandidate> {
    let stats = NormalizationStats::observe(buildings.iter().map(Arc::as_ref));

    buildings
        .iter()
        .map(|b| {
            let tag_scores = calculate_tag_scores(b, &stats);
            let mut total = weights.total(&tag_scores);

            if let (Some(query), Some(embedding)) = (query_embedding, b.embedding.as_deref()) {
                if !embedding.is_empty() {
                    let similarity = cosine_similarity(query, embedding);
                    total = total * STRUCTURED_SHARE + similarity * SEMANTIC_SHARE;
                }
            }

            ScoredCandidate {
                id: b.id.clone(),
                name: b.name().map(str::to_string),
                address: b.address().map(str::to_string),
                region: b.region.clone(),
                total_score: total,
                tag_scores,
                building: Arc::clone(b),
            }
        })
        .collect()
}

/// Sort by total score descending and keep the first `n`.
/// The sort is stable, so ties keep encounter order.
pub fn rank_top_n(mut scored: Vec<ScoredCandidate>, n: usize) -> Vec<ScoredCandidate> {
    scored.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    scored.truncate(n);
    scored
}

/// Describe the request as one line of text for the query embedding
pub fn build_query_text(request: &UserRequest) -> String {
    let mut parts = Vec::new();

    if !request.top_priorities.is_empty() {
        parts.push(format!("Top priorities: {}", request.top_priorities.join(", ")));
    }
    if let Some(budget) = &request.budget {
        if let Some(max_rent) = budget.max_rent.filter(|r| *r != 0.0) {
            parts.push(format!("Budget up to ${}", max_rent));
        }
        if let Some(bedrooms) = budget.bedrooms.filter(|b| *b != 0) {
            parts.push(format!("For {} bedroom units", bedrooms));
        }
    }
    if let Some(housing_type) = &request.housing_type {
        parts.push(format!("Housing type: {}", housing_type));
    }
    if let Some(roommate) = &request.roommate_preference {
        parts.push(format!("Roommate preference: {}", roommate));
    }
    if let Some(layout) = request.layout_requirements.as_ref().filter(|l| !l.is_empty()) {
        if let Ok(json) = serde_json::to_string(layout) {
            parts.push(format!("Layout requirements: {}", json));
        }
    }
    if let Some(notes) = request.notes_text() {
        parts.push(format!("Additional notes: {}", notes));
    }

    parts.join(" | ")
}
