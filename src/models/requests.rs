use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

/// Default search radius in miles
pub const DEFAULT_RADIUS_MILES: f64 = 5.0;

/// Search center: a place name to geocode or explicit coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Coordinates { lat: f64, lon: f64 },
    Place(String),
}

fn validate_location(location: &Location) -> Result<(), ValidationError> {
    match location {
        Location::Coordinates { lat, lon } => {
            if !(-90.0..=90.0).contains(lat) || !(-180.0..=180.0).contains(lon) {
                return Err(ValidationError::new("coordinates_out_of_range"));
            }
        }
        Location::Place(name) => {
            if name.trim().is_empty() {
                return Err(ValidationError::new("empty_place_name"));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Budget {
    #[validate(range(min = 0.0))]
    pub max_rent: Option<f64>,
    pub bedrooms: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutRequirements {
    #[serde(default)]
    pub bedrooms: Vec<u32>,
    #[serde(default)]
    pub bathrooms: Vec<f64>,
}

impl LayoutRequirements {
    pub fn is_empty(&self) -> bool {
        self.bedrooms.is_empty() && self.bathrooms.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub move_in: Option<String>,
    pub lease_term: Option<String>,
}

/// A structured recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserRequest {
    #[validate(custom(function = "validate_location"))]
    pub location: Location,
    #[validate(range(min = 0.0, max = 500.0))]
    #[serde(default)]
    pub radius_miles: Option<f64>,
    /// Ordered by importance, most important first
    #[serde(default)]
    pub top_priorities: Vec<String>,
    #[validate(nested)]
    #[serde(default)]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub housing_type: Option<String>,
    #[serde(default)]
    pub roommate_preference: Option<String>,
    #[serde(default)]
    pub layout_requirements: Option<LayoutRequirements>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub style_preference: Option<String>,
    #[serde(default)]
    pub timeline: Option<Timeline>,
}

impl UserRequest {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            radius_miles: None,
            top_priorities: Vec::new(),
            budget: None,
            housing_type: None,
            roommate_preference: None,
            layout_requirements: None,
            notes: None,
            style_preference: None,
            timeline: None,
        }
    }

    /// Radius to filter with; missing or non-positive values fall back to the default
    pub fn effective_radius(&self) -> f64 {
        self.radius_miles
            .filter(|r| *r > 0.0)
            .unwrap_or(DEFAULT_RADIUS_MILES)
    }

    /// Notes, ignoring blank text
    pub fn notes_text(&self) -> Option<&str> {
        self.notes.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// Copy of this request with refined preferences appended to the notes
    pub fn with_refinement(&self, refined: &RefinedPreferences) -> Self {
        let mut request = self.clone();
        if let Some(text) = refined.summary() {
            request.notes = Some(match self.notes_text() {
                Some(existing) => format!("{}; REFINED PREFERENCES: {}", existing, text),
                None => format!("REFINED PREFERENCES: {}", text),
            });
        }
        request
    }
}

/// Follow-up preferences collected after a first round of recommendations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedPreferences {
    #[serde(default)]
    pub amenities: Vec<String>,
    pub custom_amenities: Option<String>,
    pub commute_destination: Option<String>,
    pub max_commute_time: Option<u32>,
    pub additional_notes: Option<String>,
}

impl RefinedPreferences {
    pub fn summary(&self) -> Option<String> {
        let mut parts = Vec::new();

        if !self.amenities.is_empty() {
            parts.push(format!("Required amenities: {}", self.amenities.join(", ")));
        }
        if let Some(custom) = non_blank(&self.custom_amenities) {
            parts.push(format!("Additional amenities: {}", custom));
        }
        if let Some(destination) = non_blank(&self.commute_destination) {
            parts.push(format!(
                "Commute to {} within {} minutes",
                destination,
                self.max_commute_time.unwrap_or(30)
            ));
        }
        if let Some(notes) = non_blank(&self.additional_notes) {
            parts.push(format!("Additional requirements: {}", notes));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireLocation {
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Questionnaire body posted by the web client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    /// Liked facade cards; objects carrying a `county` field
    #[serde(default)]
    pub style_preferences: Vec<Value>,
    #[serde(default)]
    pub location: QuestionnaireLocation,
    #[serde(default)]
    pub budget: Option<BudgetRange>,
    #[serde(default)]
    pub priorities: Vec<String>,
    #[serde(default)]
    pub housing_type: Vec<String>,
    pub roommate_preference: Option<String>,
    #[serde(default)]
    pub bedrooms: Vec<u32>,
    #[serde(default)]
    pub bathrooms: Vec<f64>,
    pub move_in_timeline: Option<String>,
    pub lease_term: Option<String>,
    pub notes: Option<String>,
}

/// Body of the refinement endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefineRequest {
    #[serde(flatten)]
    pub questionnaire: Questionnaire,
    #[serde(default)]
    pub refined: RefinedPreferences,
}

impl TryFrom<Questionnaire> for UserRequest {
    type Error = String;

    fn try_from(q: Questionnaire) -> Result<Self, Self::Error> {
        let location = match (non_blank(&q.location.address), q.location.coordinates) {
            (Some(address), _) => Location::Place(address.to_string()),
            (None, Some(c)) => Location::Coordinates { lat: c.lat, lon: c.lon },
            (None, None) => return Err("location requires an address or coordinates".into()),
        };

        let budget = q
            .budget
            .as_ref()
            .and_then(|b| b.max)
            .map(|max_rent| Budget {
                max_rent: Some(max_rent),
                bedrooms: match q.bedrooms.as_slice() {
                    [only] => Some(*only),
                    _ => None,
                },
            });

        let layout = LayoutRequirements {
            bedrooms: q.bedrooms.clone(),
            bathrooms: q.bathrooms.clone(),
        };

        let timeline = if q.move_in_timeline.is_some() || q.lease_term.is_some() {
            Some(Timeline {
                move_in: q.move_in_timeline.clone(),
                lease_term: q.lease_term.clone(),
            })
        } else {
            None
        };

        Ok(UserRequest {
            location,
            radius_miles: Some(q.location.radius.unwrap_or(DEFAULT_RADIUS_MILES)),
            top_priorities: q.priorities,
            budget,
            housing_type: if q.housing_type.is_empty() {
                None
            } else {
                Some(q.housing_type.join(", "))
            },
            roommate_preference: q.roommate_preference,
            layout_requirements: if layout.is_empty() { None } else { Some(layout) },
            notes: q.notes,
            style_preference: summarize_style_cards(&q.style_preferences),
            timeline,
        })
    }
}

/// Summarize liked facade cards by region, keeping first-seen order
fn summarize_style_cards(cards: &[Value]) -> Option<String> {
    if cards.is_empty() {
        return None;
    }

    let mut counts: Vec<(String, usize)> = Vec::new();
    for card in cards {
        let county = card
            .get("county")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        match counts.iter_mut().find(|(c, _)| *c == county) {
            Some((_, n)) => *n += 1,
            None => counts.push((county, 1)),
        }
    }

    let details = counts
        .iter()
        .map(|(county, n)| format!("{} from {}", n, title_case(&county.replace('_', " "))))
        .collect::<Vec<_>>()
        .join(", ");

    Some(format!(
        "User liked {} building styles from the questionnaire cards ({})",
        cards.len(),
        details
    ))
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
