use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::geo;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine distance in meters.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        geo::distance_m(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Position reported by an attendee when finalizing their record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationSnapshot {
    pub lat: f64,
    pub lon: f64,
    /// Reported GPS accuracy in meters, 0 when the client did not send one.
    pub accuracy: f64,
}
