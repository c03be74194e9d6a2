//! Prompt text for the external ranking service.
//!
//! The system block carries the selection policy; the user block carries the
//! request and the candidate list. Geo deduplication (~30 m) and the soft
//! budget allowance are enforced by the service following these instructions,
//! not locally.

use serde_json::Value;

use crate::core::scoring::PriorityWeights;
use crate::models::{Location, ScoredCandidate, UserRequest};

pub const SYSTEM_PROMPT: &str = "\
You are a professional U.S. housing recommendation specialist.

Search scope:
- Use the user-provided center location and a straight-line radius in miles. Ignore candidates outside the radius.
- Deduplicate only by coordinates: candidates within ~30 meters great-circle distance are the same physical building.

Priority order (strict):
1) Region fit (inside the radius, after deduplication)
2) User-stated preferences, honoring their order (earlier = heavier)
3) Budget (soft constraint with limited exceedance)

Budget policy:
- Treat the budget as household-level unless stated otherwise.
- At most ONE of the three recommended buildings may exceed the budget, by at most 10%.
- Do not rank the over-budget building #1 unless it uniquely satisfies the top priority.

Rooms and roommate coupling:
- When acceptable room counts are given, derive a building's price range from those unit types only.
- A building is within budget if ANY acceptable unit price is <= budget.
- A building is soft over-budget if ANY acceptable unit price is in (budget, budget * 1.10]; use this status for at most one pick.
- When a price for an acceptable unit type is missing, estimate it (see below) or prefer buildings with known prices.

Estimating missing unit prices:
- Assume Studio <= 1BR <= 2BR <= 3BR.
- Missing kBR between known (k-1)BR and (k+1)BR: use the midpoint.
- Only a smaller type known: add 18% per extra bedroom.
- Only a larger type known: subtract 15% per bedroom.
- With several possible estimates, use the higher one for affordability checks.

Robustness:
- Select EXACTLY 3 UNIQUE building IDs from the deduplicated in-radius candidates.
- Never invent IDs and never relax the radius rule.

Scoring guidance:
- TotalScore reflects the weighted preferences; use it as a guide, not the sole signal.
- Safety is comparative, not a hard filter.
- Match mobility to the user's preference (transit vs. car).
- Amenities and nearby POIs support lifestyle fit.
- Near ties: higher TotalScore, then better fit on the top priority, then budget friendliness, then mobility fit, then more amenities, then lexicographic ID.
- Facade style preference is only a final soft tiebreaker.

Quality bar:
- #1 is the best overall match under these policies; #2 and #3 are strong alternatives.
- No geographic diversity requirement.";

const INSTRUCTIONS: &str = "\
TASK:
Apply the system policies. Filter by radius (miles), deduplicate buildings within 30 meters, then select 3 buildings.
Respect the order region > user preferences > budget (soft; at most one pick up to +10%, not #1 unless it uniquely satisfies the top priority).
Use rooms/roommate coupling when judging affordability. Style preference is a final soft tiebreaker only.

OUTPUT FORMAT:
Return EXACTLY 3 buildings as a JSON array of objects with their IDs and reasons:
[
  {\"id\": \"building_xxxx\", \"reasons\": [\"reason 1\", \"reason 2\", \"reason 3\"]},
  {\"id\": \"building_yyyy\", \"reasons\": [\"reason 1\", \"reason 2\", \"reason 3\"]},
  {\"id\": \"building_zzzz\", \"reasons\": [\"reason 1\", \"reason 2\", \"reason 3\"]}
]

Each building must have EXACTLY 3 concise reasons (max 15 words each) explaining why it fits this user.

CANDIDATE BUILDINGS:";

/// Assemble the user block for the ranking service
///
/// `resolved` is the geocoded center when the request named a place.
pub fn build_user_prompt(
    request: &UserRequest,
    resolved: Option<(f64, f64)>,
    weights: &PriorityWeights,
    candidates: &[ScoredCandidate],
) -> String {
    let mut sections = vec![
        "Recommend the top 3 buildings based on the user's preferences and the candidate list below.\n\nUSER PREFERENCES:".to_string(),
    ];

    sections.push(format!(
        "Search Area:\n- Center Location: {}\n- Radius: {} miles (straight-line distance)",
        location_text(&request.location, resolved),
        request.effective_radius()
    ));

    if !weights.is_empty() {
        let priorities = weights
            .iter()
            .map(|(tag, weight)| format!("{} (weight {:.1})", tag, weight))
            .collect::<Vec<_>>()
            .join(", ");
        sections.push(format!(
            "Top Priorities (ranked, most important first): {}",
            priorities
        ));
    }

    sections.push(format!(
        "Budget (household): {}\n- Soft constraint with at most one pick up to 10% over.",
        budget_text(request)
    ));

    sections.push(format!("Acceptable Rooms: {}", rooms_text(request)));

    if let Some(roommate) = meaningful(request.roommate_preference.as_deref()) {
        sections.push(format!("Roommate Preference: {}", roommate));
    }
    if let Some(housing) = meaningful(request.housing_type.as_deref()) {
        sections.push(format!("Housing Type Preference: {}", housing));
    }
    if let Some(layout) = layout_text(request) {
        sections.push(format!("Layout Requirements: {}", layout));
    }
    if let Some(style) = meaningful(request.style_preference.as_deref()) {
        sections.push(format!(
            "Facade Style Preferences (from image likes/dislikes; soft preference):\n{}",
            style
        ));
    }
    if let Some(notes) = request.notes_text() {
        sections.push(format!("Additional Notes: {}", notes));
    }
    if let Some(extra) = extra_constraints(request) {
        sections.push(format!("Additional Constraints:\n{}", extra));
    }

    sections.push(INSTRUCTIONS.to_string());
    sections.push(
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format_candidate(i + 1, c))
            .collect::<Vec<_>>()
            .join("\n\n"),
    );

    sections.join("\n\n").trim().to_string()
}

fn meaningful(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("flexible"))
}

fn location_text(location: &Location, resolved: Option<(f64, f64)>) -> String {
    match (location, resolved) {
        (Location::Coordinates { lat, lon }, _) => format!("Coordinates: ({}, {})", lat, lon),
        (Location::Place(name), Some((lat, lon))) => {
            format!("{} (resolved to {:.5}, {:.5})", name, lat, lon)
        }
        (Location::Place(name), None) => name.clone(),
    }
}

fn budget_text(request: &UserRequest) -> String {
    let Some(budget) = &request.budget else {
        return "No budget preference".to_string();
    };
    let mut text = match budget.max_rent {
        Some(max_rent) => format!("Max rent ${}", max_rent),
        None => "No maximum rent".to_string(),
    };
    if let Some(bedrooms) = budget.bedrooms {
        text.push_str(&format!(" for {}-bed units", bedrooms));
    }
    text
}

fn rooms_text(request: &UserRequest) -> String {
    match &request.layout_requirements {
        Some(layout) if !layout.bedrooms.is_empty() => join_numbers(&layout.bedrooms, ", "),
        _ => "Flexible".to_string(),
    }
}

fn layout_text(request: &UserRequest) -> Option<String> {
    let layout = request.layout_requirements.as_ref()?;
    let mut parts = Vec::new();
    if !layout.bedrooms.is_empty() {
        parts.push(format!("Bedrooms: {}", join_numbers(&layout.bedrooms, "/")));
    }
    if !layout.bathrooms.is_empty() {
        parts.push(format!("Bathrooms: {}", join_numbers(&layout.bathrooms, "/")));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn extra_constraints(request: &UserRequest) -> Option<String> {
    let timeline = request.timeline.as_ref()?;
    let mut lines = Vec::new();
    if let Some(move_in) = meaningful(timeline.move_in.as_deref()) {
        lines.push(format!("- Move-in timeline: {}", move_in));
    }
    if let Some(lease) = meaningful(timeline.lease_term.as_deref()) {
        lines.push(format!("- Lease term: {}", lease));
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn join_numbers<T: ToString>(values: &[T], sep: &str) -> String {
    values.iter().map(T::to_string).collect::<Vec<_>>().join(sep)
}

/// Render a raw attribute for the prompt; missing values become "N/A"
fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn pricing_text(candidate: &ScoredCandidate) -> String {
    let pricing = &candidate.building.pricing;
    if let Some(text) = &pricing.range_text {
        return text.clone();
    }

    let units: Vec<String> = pricing
        .units
        .iter()
        .filter_map(|u| {
            let rent = u.rent?;
            Some(match u.bedrooms {
                Some(0) => format!("Studio ${}", rent),
                Some(n) => format!("{}BR ${}", n, rent),
                None => format!("${}", rent),
            })
        })
        .collect();

    if units.is_empty() {
        "N/A".to_string()
    } else {
        units.join("; ")
    }
}

/// One numbered candidate entry of the user block
pub fn format_candidate(idx: usize, candidate: &ScoredCandidate) -> String {
    let b = &candidate.building;
    format!(
        "{idx}. ID={id}\n   Name: {name}\n   Address: {address}\n   TotalScore: {score:.3}\n\n   \
         Safety: {incidents} incidents, rating={rating}\n   \
         Public Transit: {transit} stops nearby\n   \
         Car Friendly: {car}/100\n   \
         Amenities: {amenities} total\n   \
         Nearby POIs: dining={dining}, shopping={shopping}, fitness={fitness}, entertainment={entertainment}\n   \
         Pricing: {pricing}\n   \
         Latitude: {lat}\n   \
         Longitude: {lon}",
        idx = idx,
        id = candidate.id,
        name = candidate.name.as_deref().unwrap_or("N/A"),
        address = candidate.address.as_deref().unwrap_or("N/A"),
        score = candidate.total_score,
        incidents = display(b.lookup(&["crime_stats", "total_incidents"])),
        rating = display(b.lookup(&["crime_stats", "safety_score"])),
        transit = display(b.lookup(&["transit_accessibility", "total_transit"])),
        car = display(b.lookup(&["car_friendly", "car_score"])),
        amenities = b.amenities().len(),
        dining = b.poi_count("dining"),
        shopping = b.poi_count("shopping"),
        fitness = b.poi_count("fitness"),
        entertainment = b.poi_count("entertainment"),
        pricing = pricing_text(candidate),
        lat = b.lat.map_or_else(|| "N/A".to_string(), |v| v.to_string()),
        lon = b.lon.map_or_else(|| "N/A".to_string(), |v| v.to_string()),
    )
}
