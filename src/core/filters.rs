use geo::{coord, Intersects, Rect};
use serde::Deserialize;
use std::sync::Arc;

use crate::core::distance::is_within_radius;
use crate::models::{BuildingRecord, Budget};

/// Sanity box around the served region.
///
/// A resolved point outside it is treated as a geocoder mis-resolution.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RegionBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl RegionBounds {
    /// San Francisco Bay Area
    pub const BAY_AREA: RegionBounds = RegionBounds {
        lat_min: 36.9,
        lat_max: 38.9,
        lon_min: -123.2,
        lon_max: -121.2,
    };

    /// Inclusive containment test
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let rect = Rect::new(
            coord! { x: self.lon_min, y: self.lat_min },
            coord! { x: self.lon_max, y: self.lat_max },
        );
        rect.intersects(&coord! { x: lon, y: lat })
    }
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self::BAY_AREA
    }
}

/// How the location gate treated the request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationGate {
    /// Kept only candidates within the radius of `center`
    Filtered { center: (f64, f64) },
    /// The location could not be resolved; all candidates pass
    Unresolved,
    /// The resolved point lies outside the region; all candidates pass
    OutOfRegion { center: (f64, f64) },
}

/// Stage 1: location-radius gate
///
/// Falls back to the unfiltered set when `center` is unknown or outside
/// `bounds`. Candidates without coordinates never survive a real filter.
pub fn filter_by_location(
    buildings: &[Arc<BuildingRecord>],
    center: Option<(f64, f64)>,
    radius_miles: f64,
    bounds: &RegionBounds,
) -> (Vec<Arc<BuildingRecord>>, LocationGate) {
    let (lat, lon) = match center {
        Some(c) => c,
        None => return (buildings.to_vec(), LocationGate::Unresolved),
    };

    if !bounds.contains(lat, lon) {
        return (buildings.to_vec(), LocationGate::OutOfRegion { center: (lat, lon) });
    }

    let kept = buildings
        .iter()
        .filter(|b| match b.coordinates() {
            Some((b_lat, b_lon)) => is_within_radius(lat, lon, b_lat, b_lon, radius_miles),
            None => false,
        })
        .cloned()
        .collect();

    (kept, LocationGate::Filtered { center: (lat, lon) })
}

/// Stage 2: budget gate with room coupling
pub fn filter_by_budget(
    buildings: Vec<Arc<BuildingRecord>>,
    budget: Option<&Budget>,
) -> Vec<Arc<BuildingRecord>> {
    let Some(budget) = budget else {
        return buildings;
    };
    let Some(max_rent) = budget.max_rent else {
        return buildings;
    };

    buildings
        .into_iter()
        .filter(|b| matches_budget(b, max_rent, budget.bedrooms))
        .collect()
}

/// Check whether a building has a unit within `max_rent`
///
/// Rents come from the unit types matching `bedrooms` (every unit type when
/// `None`). Without structured rents the pricing string is parsed; with no
/// pricing at all the building passes.
pub fn matches_budget(building: &BuildingRecord, max_rent: f64, bedrooms: Option<u32>) -> bool {
    let rents: Vec<f64> = building
        .pricing
        .units
        .iter()
        .filter(|unit| bedrooms.is_none() || unit.bedrooms == bedrooms)
        .filter_map(|unit| unit.rent)
        .filter(|rent| bedrooms.is_none() || *rent != 0.0)
        .collect();

    if !rents.is_empty() {
        return rents.iter().any(|rent| *rent <= max_rent);
    }

    if let Some(text) = &building.pricing.range_text {
        let numbers = parse_price_tokens(text);
        if let Some(min) = numbers.into_iter().reduce(f64::min) {
            return min <= max_rent;
        }
    }

    true
}

/// Extract numeric tokens from a pricing string like "$1,780 - $6,670"
pub fn parse_price_tokens(text: &str) -> Vec<f64> {
    text.replace(['$', ','], "")
        .split_whitespace()
        .filter_map(|token| token.parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .collect()
}
