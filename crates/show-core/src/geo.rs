//! Geographic types and calculations for formation projection
//!
//! Formations are laid out in a local tangent plane (meters, x = east,
//! y = north, z = up) around a center point and projected to latitude and
//! longitude with a small-angle equirectangular approximation. The
//! approximation holds for offsets of a few hundred meters; nothing here
//! corrects for larger radii.

use serde::{Deserialize, Serialize};

/// Earth's radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude used by the tangent-plane projection
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Geographic position with latitude, longitude, and altitude
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
    /// Altitude in meters
    pub altitude: f64,
}

impl GeoPoint {
    /// Create a new geographic point
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Check if this point is valid
    pub fn is_valid(&self) -> bool {
        self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Project a tangent-plane offset centered on this point
    pub fn offset_by(&self, offset: &RelativeOffset) -> GeoPoint {
        let lat_offset = offset.y / METERS_PER_DEGREE;
        let lng_offset = offset.x / (METERS_PER_DEGREE * self.latitude.to_radians().cos());

        GeoPoint::new(
            self.latitude + lat_offset,
            self.longitude + lng_offset,
            self.altitude + offset.z,
        )
    }

    /// Great-circle distance to another point in meters, ignoring altitude
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lng = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Segment length in meters with horizontal and vertical legs treated as orthogonal
    pub fn segment_distance_to(&self, other: &GeoPoint) -> f64 {
        let horizontal = self.distance_to(other);
        let vertical = (other.altitude - self.altitude).abs();
        (horizontal * horizontal + vertical * vertical).sqrt()
    }

    /// Interpolate between two points
    /// fraction: 0.0 = self, 1.0 = other
    pub fn interpolate(&self, other: &GeoPoint, fraction: f64) -> GeoPoint {
        let fraction = fraction.clamp(0.0, 1.0);

        GeoPoint::new(
            self.latitude + (other.latitude - self.latitude) * fraction,
            self.longitude + (other.longitude - self.longitude) * fraction,
            self.altitude + (other.altitude - self.altitude) * fraction,
        )
    }

    /// Convert to array [latitude, longitude, altitude]
    pub fn to_array(&self) -> [f64; 3] {
        [self.latitude, self.longitude, self.altitude]
    }
}

/// Offset in meters within the tangent plane of a formation center
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelativeOffset {
    /// East
    pub x: f64,
    /// North
    pub y: f64,
    /// Up, relative to the center altitude
    pub z: f64,
}

impl RelativeOffset {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Flat offset at `angle` radians (counter-clockwise from east) and `radius` meters
    pub fn polar(angle: f64, radius: f64) -> Self {
        Self::new(angle.cos() * radius, angle.sin() * radius, 0.0)
    }

    /// Linear interpolation, unclamped
    pub fn lerp(&self, other: &RelativeOffset, t: f64) -> RelativeOffset {
        RelativeOffset::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
            self.z + t * (other.z - self.z),
        )
    }

    /// Horizontal distance from the formation center
    pub fn planar_radius(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Project `offset` around `center`
pub fn offset_to_geo_point(center: &GeoPoint, offset: &RelativeOffset) -> GeoPoint {
    center.offset_by(offset)
}

/// Haversine distance in meters
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    p1.distance_to(p2)
}

/// Horizontal haversine leg combined with the altitude difference
pub fn segment_distance_3d(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    p1.segment_distance_to(p2)
}

// ============================================================================
// TESTS
// ============================================================================
