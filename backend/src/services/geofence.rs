//! Geofence evaluation against a lecture's anchor.
//!
//! Two radii are in play: a lenient one for join (the attendee may still be
//! walking to the room) and a strict one for ping and submit.

use crate::{error::GeofenceViolation, models::location::Coordinates};

pub const DEFAULT_JOIN_RADIUS_M: f64 = 5000.0;
pub const DEFAULT_PRESENCE_RADIUS_M: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceCheck {
    pub distance_m: f64,
    pub radius_m: f64,
    pub location: Coordinates,
    pub anchor: Coordinates,
}

impl GeofenceCheck {
    pub fn evaluate(anchor: Coordinates, location: Coordinates, radius_m: f64) -> Self {
        Self {
            distance_m: location.distance_to(&anchor),
            radius_m,
            location,
            anchor,
        }
    }

    /// Inside or exactly on the boundary.
    pub fn is_inside(&self) -> bool {
        self.distance_m <= self.radius_m
    }

    pub fn enforce(self) -> Result<Self, GeofenceViolation> {
        if self.is_inside() {
            Ok(self)
        } else {
            Err(GeofenceViolation {
                distance_m: self.distance_m,
                radius_m: self.radius_m,
                location: self.location,
                anchor: self.anchor,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ~300m north of the origin on a 6371km sphere.
    const LAT_300M: f64 = 0.002698;

    #[test]
    fn point_outside_radius_yields_violation_with_diagnostics() {
        let anchor = Coordinates::new(0.0, 0.0);
        let location = Coordinates::new(LAT_300M, 0.0);
        let violation = GeofenceCheck::evaluate(anchor, location, 200.0)
            .enforce()
            .unwrap_err();
        assert!((violation.distance_m - 300.0).abs() < 1.0);
        assert_eq!(violation.radius_m, 200.0);
        assert_eq!(violation.location, location);
        assert_eq!(violation.anchor, anchor);
    }

    #[test]
    fn point_inside_radius_passes() {
        let check = GeofenceCheck::evaluate(
            Coordinates::new(0.0, 0.0),
            Coordinates::new(0.00045, 0.0),
            200.0,
        );
        assert!(check.is_inside());
        assert!(check.enforce().is_ok());
    }

    #[test]
    fn boundary_counts_as_inside() {
        let check = GeofenceCheck::evaluate(Coordinates::new(1.0, 1.0), Coordinates::new(1.0, 1.0), 0.0);
        assert!(check.is_inside());
    }
}
