//! Flat-earth circle math used by the geofence.
//!
//! Coordinates are plain `(lat, lng)` pairs treated as a Euclidean plane. Radii are supplied
//! in metres and converted to degree units through a single [`GeoScale`] divisor.

/// Default number of metres mapped onto one degree unit.
pub const DEFAULT_DEGREE_DIVISOR: f64 = 100_000.0;

/// A point in `(lat, lng)` degree space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Build a point from latitude and longitude.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A circle whose radius is already expressed in degree units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Centre of the circle.
    pub centre: GeoPoint,
    /// Radius in degree units.
    pub radius: f64,
}

/// Converts metre radii into the degree units used by [`intersect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoScale {
    divisor: f64,
}

impl GeoScale {
    /// Create a scale dividing metres by `divisor`.
    pub fn new(divisor: f64) -> Self {
        Self { divisor }
    }

    /// Convert a radius in metres to degree units.
    pub fn degrees(&self, metres: f64) -> f64 {
        metres / self.divisor
    }

    /// Build a circle around `centre` from a radius in metres.
    pub fn circle(&self, centre: GeoPoint, radius_m: f64) -> Circle {
        Circle {
            centre,
            radius: self.degrees(radius_m),
        }
    }
}

impl Default for GeoScale {
    fn default() -> Self {
        Self::new(DEFAULT_DEGREE_DIVISOR)
    }
}

/// Euclidean distance between two points in degree space.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    ((a.lat - b.lat).powi(2) + (a.lng - b.lng).powi(2)).sqrt()
}

/// Whether two circles overlap. Touching circles do not intersect.
pub fn intersect(a: &Circle, b: &Circle) -> bool {
    distance(a.centre, b.centre) < a.radius + b.radius
}

/// Whether `point` lies inside or on the boundary of `circle`.
pub fn point_in_circle(point: GeoPoint, circle: &Circle) -> bool {
    (point.lat - circle.centre.lat).powi(2) + (point.lng - circle.centre.lng).powi(2)
        <= circle.radius.powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_scale() -> GeoScale {
        GeoScale::new(1.0)
    }

    #[test]
    fn distance_is_euclidean() {
        let d = distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(3.0, 4.0));
        assert_eq!(d, 5.0);
    }

    #[test]
    fn overlapping_circles_intersect() {
        let scale = unit_scale();
        let a = scale.circle(GeoPoint::new(0.0, 0.0), 3.0);
        let b = scale.circle(GeoPoint::new(3.0, 4.0), 3.0);
        assert!(intersect(&a, &b));
    }

    #[test]
    fn touching_circles_do_not_intersect() {
        let scale = unit_scale();
        let a = scale.circle(GeoPoint::new(0.0, 0.0), 2.0);
        let b = scale.circle(GeoPoint::new(3.0, 4.0), 3.0);
        assert!(!intersect(&a, &b));
    }

    #[test]
    fn distant_circles_do_not_intersect() {
        let scale = unit_scale();
        let a = scale.circle(GeoPoint::new(0.0, 0.0), 1.0);
        let b = scale.circle(GeoPoint::new(10.0, 10.0), 1.0);
        assert!(!intersect(&a, &b));
    }

    #[test]
    fn point_on_boundary_is_inside() {
        let circle = unit_scale().circle(GeoPoint::new(0.0, 0.0), 5.0);
        assert!(point_in_circle(GeoPoint::new(3.0, 4.0), &circle));
        assert!(!point_in_circle(GeoPoint::new(3.0, 4.1), &circle));
    }

    #[test]
    fn default_scale_divides_by_hundred_thousand() {
        let scale = GeoScale::default();
        assert_eq!(scale.degrees(100_000.0), 1.0);
        assert_eq!(scale.degrees(50_000.0), 0.5);
    }

    #[test]
    fn player_near_mark_triggers_quest_circle() {
        let scale = GeoScale::default();
        let quest = scale.circle(GeoPoint::new(55.75, 37.62), 50.0);
        let player = scale.circle(GeoPoint::new(55.7501, 37.6201), 100.0);
        assert!(intersect(&player, &quest));
    }
}
