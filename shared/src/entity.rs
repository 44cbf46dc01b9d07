use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::CrowdLevel;

/// Stable key for an entity across fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Native code when present and non-empty, otherwise `name@lat,lng`.
    /// The synthesized form stays stable as long as none of the three change.
    pub fn derive(code: Option<&str>, name: &str, position: LatLng) -> Self {
        match code.map(str::trim) {
            Some(code) if !code.is_empty() => Self(code.to_string()),
            _ => Self(format!("{name}@{},{}", position.lat, position.lng)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// South-west / north-east corners of a rectangular area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PopulationRange {
    pub min: i64,
    pub max: i64,
}

impl PopulationRange {
    pub const fn is_empty(&self) -> bool {
        self.min == 0 && self.max == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub time: String,
    pub level: CrowdLevel,
    pub population: PopulationRange,
}

/// One crowding-reportable location as held by the Entity Store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub position: LatLng,
    pub level: CrowdLevel,
    #[serde(default)]
    pub population: PopulationRange,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub forecast: Vec<ForecastPoint>,
}
