// ABOUTME: Great-circle distance, radius containment, and bounding-box math
// ABOUTME: Haversine on a spherical Earth plus an equirectangular box approximation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use musclemap_core::constants::{earth, geohash};
use musclemap_core::{AccelError, AccelResult, BoundingBox, Coordinate, GeohashPrecision};

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Great-circle distance between two points in meters
#[must_use]
pub fn haversine_meters(from: Coordinate, to: Coordinate) -> f64 {
    let phi1 = from.lat() * DEG_TO_RAD;
    let phi2 = to.lat() * DEG_TO_RAD;
    let d_phi = (to.lat() - from.lat()) * DEG_TO_RAD;
    let d_lambda = (to.lng() - from.lng()) * DEG_TO_RAD;

    let sin_d_phi = (d_phi * 0.5).sin();
    let sin_d_lambda = (d_lambda * 0.5).sin();

    let a = (phi1.cos() * phi2.cos())
        .mul_add(sin_d_lambda * sin_d_lambda, sin_d_phi * sin_d_phi)
        .clamp(0.0, 1.0);

    earth::RADIUS_METERS * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Validate a radius in meters
///
/// # Errors
///
/// Returns `InvalidRadius` for NaN, infinite or negative values
pub fn checked_radius(radius_meters: f64) -> AccelResult<f64> {
    if radius_meters.is_finite() && radius_meters >= 0.0 {
        Ok(radius_meters)
    } else {
        Err(AccelError::InvalidRadius(radius_meters))
    }
}

/// Whether `point` lies within `radius_meters` of `center`
///
/// # Errors
///
/// Returns `InvalidRadius` for NaN, infinite or negative radii
pub fn is_within_radius(center: Coordinate, point: Coordinate, radius_meters: f64) -> AccelResult<bool> {
    let radius = checked_radius(radius_meters)?;
    Ok(haversine_meters(center, point) <= radius)
}

/// Box enclosing the circle of `radius_meters` around `center`
///
/// # Errors
///
/// Returns `InvalidRadius` for NaN, infinite or negative radii
pub fn bounding_box(center: Coordinate, radius_meters: f64) -> AccelResult<BoundingBox> {
    let radius = checked_radius(radius_meters)?;
    let lat_delta = (radius / earth::RADIUS_METERS) * RAD_TO_DEG;
    let lng_delta =
        (radius / (earth::RADIUS_METERS * (center.lat() * DEG_TO_RAD).cos())) * RAD_TO_DEG;

    Ok(BoundingBox {
        min_lat: (center.lat() - lat_delta).max(earth::MIN_LAT),
        max_lat: (center.lat() + lat_delta).min(earth::MAX_LAT),
        min_lng: center.lng() - lng_delta,
        max_lng: center.lng() + lng_delta,
    })
}

/// Coarsest precision whose cell width fits inside `radius_meters`; 12 otherwise
#[must_use]
pub fn optimal_precision(radius_meters: f64) -> GeohashPrecision {
    for (level, &width) in geohash::CELL_WIDTHS_METERS.iter().enumerate() {
        if radius_meters >= width {
            // Safe: level < 12
            return GeohashPrecision::clamped(level as i64 + 1);
        }
    }
    GeohashPrecision::MAX
}
