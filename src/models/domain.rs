use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while typing a raw building document at load time
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("Building document is not a JSON object")]
    NotAnObject,

    #[error("Building document has no building_id")]
    MissingId,
}

/// Rent quote for one unit type of a building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRent {
    /// Bedroom count of the unit type (0 = studio)
    pub bedrooms: Option<u32>,
    pub rent: Option<f64>,
}

/// Pricing information typed at load time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Structured per-unit-type rents (`rentcast_data`)
    pub units: Vec<UnitRent>,
    /// Free-text range such as "$1,780 - $6,670"
    pub range_text: Option<String>,
}

/// A building loaded from the dataset.
///
/// Identifier, coordinates and pricing are typed; every other field stays in
/// the opaque `attributes` map because its schema varies by data source.
#[derive(Debug, Clone)]
pub struct BuildingRecord {
    pub id: String,
    pub region: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub pricing: Pricing,
    pub attributes: Map<String, Value>,
    pub embedding: Option<Vec<f32>>,
}

impl BuildingRecord {
    /// Type a raw building document. Unknown fields are kept in `attributes`.
    pub fn from_json(region: &str, value: Value) -> Result<Self, RecordError> {
        let attributes = match value {
            Value::Object(map) => map,
            _ => return Err(RecordError::NotAnObject),
        };

        let id = match attributes.get("building_id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(RecordError::MissingId),
        };

        let lat = attributes
            .get("lat")
            .and_then(as_number)
            .filter(|v| (-90.0..=90.0).contains(v));
        let lon = attributes
            .get("lon")
            .and_then(as_number)
            .filter(|v| (-180.0..=180.0).contains(v));

        let units = attributes
            .get("rentcast_data")
            .map(as_list)
            .unwrap_or_default()
            .into_iter()
            .map(|entry| UnitRent {
                bedrooms: entry
                    .get("bedrooms")
                    .and_then(as_number)
                    .filter(|b| *b >= 0.0 && b.fract() == 0.0)
                    .map(|b| b as u32),
                rent: entry.get("rent").and_then(as_number),
            })
            .collect();

        let range_text = attributes
            .get("pricing")
            .or_else(|| attributes.get("Pricing"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        Ok(Self {
            id,
            region: region.to_string(),
            lat,
            lon,
            pricing: Pricing { units, range_text },
            attributes,
            embedding: None,
        })
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }

    /// Walk nested objects in the attribute bag
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.attributes.get(*first)?;
        for key in rest {
            current = current.get(*key)?;
        }
        Some(current)
    }

    fn number_at(&self, path: &[&str]) -> f64 {
        self.lookup(path).and_then(as_number).unwrap_or(0.0)
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get("title").and_then(Value::as_str)
    }

    pub fn address(&self) -> Option<&str> {
        self.attributes.get("address").and_then(Value::as_str)
    }

    pub fn incident_count(&self) -> f64 {
        self.number_at(&["crime_stats", "total_incidents"])
    }

    pub fn transit_stops(&self) -> f64 {
        self.number_at(&["transit_accessibility", "total_transit"])
    }

    /// Commute time to downtown; `None` when absent, blank or zero
    pub fn commute_minutes(&self) -> Option<f64> {
        self.attributes
            .get("commute_to_downtown_minutes")
            .and_then(as_number)
            .filter(|m| *m != 0.0)
    }

    pub fn poi_count(&self, category: &str) -> f64 {
        self.number_at(&["nearby_pois", "categories", category])
    }

    pub fn car_score(&self) -> f64 {
        self.number_at(&["car_friendly", "car_score"])
    }

    pub fn amenities(&self) -> Vec<&str> {
        self.attributes
            .get("amenities")
            .map(as_list)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Value::as_str)
            .collect()
    }
}

/// Interpret a JSON number or numeric string as a finite `f64`
pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Treat a scalar as a one-element list and `null` as empty
pub fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// A preference dimension used both as a priority key and a scoring axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    Safety,
    Commute,
    #[serde(rename = "Public Transit")]
    PublicTransit,
    #[serde(rename = "Near Grocery")]
    NearGrocery,
    #[serde(rename = "Car Friendly")]
    CarFriendly,
    Lifestyle,
    #[serde(rename = "Pet Friendly")]
    PetFriendly,
    Amenities,
}

impl Tag {
    pub const ALL: [Tag; 8] = [
        Tag::Safety,
        Tag::Commute,
        Tag::PublicTransit,
        Tag::NearGrocery,
        Tag::CarFriendly,
        Tag::Lifestyle,
        Tag::PetFriendly,
        Tag::Amenities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Safety => "Safety",
            Tag::Commute => "Commute",
            Tag::PublicTransit => "Public Transit",
            Tag::NearGrocery => "Near Grocery",
            Tag::CarFriendly => "Car Friendly",
            Tag::Lifestyle => "Lifestyle",
            Tag::PetFriendly => "Pet Friendly",
            Tag::Amenities => "Amenities",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Tag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown tag: {}", wanted))
    }
}

/// Per-tag scores of one candidate, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TagScores {
    #[serde(rename = "Safety")]
    pub safety: f64,
    #[serde(rename = "Commute")]
    pub commute: f64,
    #[serde(rename = "Public Transit")]
    pub public_transit: f64,
    #[serde(rename = "Near Grocery")]
    pub near_grocery: f64,
    #[serde(rename = "Car Friendly")]
    pub car_friendly: f64,
    #[serde(rename = "Lifestyle")]
    pub lifestyle: f64,
    #[serde(rename = "Pet Friendly")]
    pub pet_friendly: f64,
    #[serde(rename = "Amenities")]
    pub amenities: f64,
}

impl TagScores {
    pub fn get(&self, tag: Tag) -> f64 {
        match tag {
            Tag::Safety => self.safety,
            Tag::Commute => self.commute,
            Tag::PublicTransit => self.public_transit,
            Tag::NearGrocery => self.near_grocery,
            Tag::CarFriendly => self.car_friendly,
            Tag::Lifestyle => self.lifestyle,
            Tag::PetFriendly => self.pet_friendly,
            Tag::Amenities => self.amenities,
        }
    }
}

/// A candidate after scoring
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    #[serde(rename = "building_id")]
    pub id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub region: String,
    #[serde(rename = "total_score")]
    pub total_score: f64,
    #[serde(rename = "tag_scores")]
    pub tag_scores: TagScores,
    #[serde(skip)]
    pub building: Arc<BuildingRecord>,
}

/// One entry of the final shortlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPick {
    pub id: String,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl FinalPick {
    pub fn without_reasons(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reasons: Vec::new(),
        }
    }
}

/// Where the shortlist came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingSource {
    RankingService,
    ScoreFallback,
}

/// Result of one recommendation request
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResult {
    pub request_id: uuid::Uuid,
    pub top_candidates: Vec<ScoredCandidate>,
    pub shortlist: Vec<FinalPick>,
    pub ranking_source: RankingSource,
}

impl RecommendationResult {
    /// Find a top-N entry by building id
    pub fn candidate(&self, id: &str) -> Option<&ScoredCandidate> {
        self.top_candidates.iter().find(|c| c.id == id)
    }
}
