// ABOUTME: Pure Rust great-circle distance and bounding-box math
// ABOUTME: Fallback for the native distance exports with identical formulas and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use musclemap_core::constants::earth;
use musclemap_core::{AccelError, AccelResult, BoundingBox, Coordinate, GeohashPrecision};

fn validate_radius(radius_meters: f64) -> AccelResult<()> {
    if radius_meters.is_finite() && radius_meters >= 0.0 {
        Ok(())
    } else {
        Err(AccelError::InvalidRadius(radius_meters))
    }
}

/// Haversine distance in meters
#[must_use]
pub fn haversine(from: Coordinate, to: Coordinate) -> f64 {
    let (lat1, lat2) = (from.lat().to_radians(), to.lat().to_radians());
    let half_dlat = (to.lat() - from.lat()).to_radians() / 2.0;
    let half_dlng = (to.lng() - from.lng()).to_radians() / 2.0;

    let h = (lat1.cos() * lat2.cos())
        .mul_add(half_dlng.sin().powi(2), half_dlat.sin().powi(2))
        .clamp(0.0, 1.0);
    2.0 * earth::RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Whether `point` is at most `radius_meters` from `center`
///
/// # Errors
///
/// `InvalidRadius` for negative or non-finite radii
pub fn is_within_radius(center: Coordinate, point: Coordinate, radius_meters: f64) -> AccelResult<bool> {
    validate_radius(radius_meters)?;
    Ok(haversine(center, point) <= radius_meters)
}

/// Equirectangular box around a circle, latitude clamped to the poles
///
/// # Errors
///
/// `InvalidRadius` for negative or non-finite radii
pub fn bounding_box(center: Coordinate, radius_meters: f64) -> AccelResult<BoundingBox> {
    validate_radius(radius_meters)?;
    let angular = radius_meters / earth::RADIUS_METERS;
    let dlat = angular.to_degrees();
    let dlng = (angular / center.lat().to_radians().cos()).to_degrees();
    Ok(BoundingBox {
        min_lat: (center.lat() - dlat).max(earth::MIN_LAT),
        max_lat: (center.lat() + dlat).min(earth::MAX_LAT),
        min_lng: center.lng() - dlng,
        max_lng: center.lng() + dlng,
    })
}

/// First precision level whose cell width does not exceed the radius
#[must_use]
pub fn optimal_precision(radius_meters: f64) -> GeohashPrecision {
    GeohashPrecision::levels()
        .find(|level| radius_meters >= level.cell_width_meters())
        .unwrap_or(GeohashPrecision::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_of_latitude() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(1.0, 0.0).unwrap();
        assert!((haversine(a, b) - 111_194.9).abs() < 1.0);
    }

    #[test]
    fn test_radius_checks() {
        let a = Coordinate::new(51.5074, -0.1278).unwrap();
        let b = Coordinate::new(51.5080, -0.1280).unwrap();
        assert_eq!(is_within_radius(a, b, 100.0), Ok(true));
        assert_eq!(is_within_radius(a, b, 10.0), Ok(false));
        assert!(bounding_box(a, f64::INFINITY).is_err());
    }

    #[test]
    fn test_optimal_precision_never_fails() {
        assert_eq!(optimal_precision(f64::NAN), GeohashPrecision::MAX);
        assert_eq!(optimal_precision(-5.0), GeohashPrecision::MAX);
        assert_eq!(optimal_precision(1e9).get(), 1);
    }
}
