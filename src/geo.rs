// ABOUTME: Dispatched geohash and distance API over the native library or the pure fallback
// ABOUTME: Validates inputs once, then routes each call and degrades per call on native failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Geo service
//!
//! Callers never see which backend answered. Input validation happens here,
//! before either backend runs, so both paths report identical errors.

use crate::fallback::{distance, geohash};
use crate::native::NativeGeo;
use crate::registry::Backend;
use musclemap_core::constants::libraries;
use musclemap_core::{AccelError, AccelResult, BoundingBox, Coordinate, GeohashPrecision};
use tracing::warn;

/// Geohash codec and distance utilities
#[derive(Clone)]
pub struct GeoService {
    native: Option<NativeGeo>,
}

impl GeoService {
    /// Service that always uses the pure fallback
    #[must_use]
    pub const fn fallback() -> Self {
        Self { native: None }
    }

    /// Service backed by a bound native library
    #[must_use]
    pub fn native(geo: NativeGeo) -> Self {
        Self { native: Some(geo) }
    }

    pub(crate) fn from_binding(geo: Option<NativeGeo>) -> Self {
        Self { native: geo }
    }

    /// Backend answering calls
    #[must_use]
    pub const fn backend(&self) -> Backend {
        if self.native.is_some() {
            Backend::Native
        } else {
            Backend::Fallback
        }
    }

    fn dispatch<T>(
        &self,
        operation: &'static str,
        native: impl FnOnce(&NativeGeo) -> Option<T>,
        fallback: impl FnOnce() -> T,
    ) -> T {
        if let Some(geo) = &self.native {
            if let Some(value) = native(geo) {
                return value;
            }
            warn!(
                backend = "native",
                library = libraries::GEO,
                operation,
                "Native call failed, answering from fallback"
            );
        }
        fallback()
    }

    /// Encode a coordinate as a geohash of `precision` symbols
    ///
    /// # Errors
    ///
    /// `InvalidLatitude` / `InvalidLongitude` for out-of-range coordinates
    pub fn encode(&self, lat: f64, lng: f64, precision: GeohashPrecision) -> AccelResult<String> {
        let coord = Coordinate::new(lat, lng)?;
        Ok(self.dispatch(
            "geohash_encode",
            |geo| geo.encode(coord, precision),
            || geohash::encode(coord, precision),
        ))
    }

    /// Decode a geohash to the center of its cell
    ///
    /// # Errors
    ///
    /// `InvalidGeohashLength` or `InvalidGeohashCharacter` for malformed hashes
    pub fn decode(&self, hash: &str) -> AccelResult<Coordinate> {
        GeohashPrecision::for_hash(hash)?;
        self.dispatch(
            "geohash_decode",
            |geo| geo.decode(hash).map(Ok),
            || geohash::decode(hash),
        )
    }

    /// The eight adjacent cells, ordered N, NE, E, SE, S, SW, W, NW
    ///
    /// Longitude wraps across the antimeridian. Latitude is clamped at the
    /// poles, so for a cell in the top row N is the cell itself and NE/NW
    /// equal E/W; the bottom row mirrors this with S, SE and SW. For example
    /// `neighbors("u")` is `["u", "v", "v", "t", "s", "e", "g", "g"]`.
    ///
    /// # Errors
    ///
    /// `InvalidGeohashLength` or `InvalidGeohashCharacter` for malformed hashes
    pub fn neighbors(&self, hash: &str) -> AccelResult<[String; 8]> {
        GeohashPrecision::for_hash(hash)?;
        self.dispatch(
            "geohash_neighbors",
            |geo| geo.neighbors(hash).map(Ok),
            || geohash::neighbors(hash),
        )
    }

    /// Latitude and longitude half-errors of a cell, in degrees
    #[must_use]
    pub fn precision_error(&self, precision: GeohashPrecision) -> (f64, f64) {
        self.dispatch(
            "geohash_precision_error",
            |geo| geo.precision_error(precision),
            || geohash::precision_error(precision),
        )
    }

    /// Great-circle distance in meters
    ///
    /// # Errors
    ///
    /// `InvalidLatitude` / `InvalidLongitude` for out-of-range coordinates
    pub fn haversine(&self, lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> AccelResult<f64> {
        let from = Coordinate::new(lat1, lng1)?;
        let to = Coordinate::new(lat2, lng2)?;
        Ok(self.distance(from, to))
    }

    fn distance(&self, from: Coordinate, to: Coordinate) -> f64 {
        self.dispatch(
            "haversine_meters",
            |geo| geo.haversine(from, to),
            || distance::haversine(from, to),
        )
    }

    /// Whether the second point lies within `radius_meters` of the first
    ///
    /// # Errors
    ///
    /// Coordinate range errors, or `InvalidRadius` for negative or non-finite radii
    pub fn is_within_radius(
        &self,
        lat1: f64,
        lng1: f64,
        lat2: f64,
        lng2: f64,
        radius_meters: f64,
    ) -> AccelResult<bool> {
        let center = Coordinate::new(lat1, lng1)?;
        let point = Coordinate::new(lat2, lng2)?;
        checked_radius(radius_meters)?;
        self.dispatch(
            "is_within_radius",
            |geo| geo.is_within_radius(center, point, radius_meters).map(Ok),
            || distance::is_within_radius(center, point, radius_meters),
        )
    }

    /// Box enclosing the circle of `radius_meters` around a point
    ///
    /// Latitude is clamped to the poles; longitude is not wrapped.
    ///
    /// # Errors
    ///
    /// Coordinate range errors, or `InvalidRadius` for negative or non-finite radii
    pub fn bounding_box(&self, lat: f64, lng: f64, radius_meters: f64) -> AccelResult<BoundingBox> {
        let center = Coordinate::new(lat, lng)?;
        checked_radius(radius_meters)?;
        self.dispatch(
            "bounding_box",
            |geo| geo.bounding_box(center, radius_meters).map(Ok),
            || distance::bounding_box(center, radius_meters),
        )
    }

    /// Coarsest precision whose cells fit inside `radius_meters`
    #[must_use]
    pub fn optimal_precision(&self, radius_meters: f64) -> GeohashPrecision {
        self.dispatch(
            "optimal_precision",
            |geo| geo.optimal_precision(radius_meters),
            || distance::optimal_precision(radius_meters),
        )
    }

    /// Encode many `(lat, lng)` pairs at one precision
    ///
    /// # Errors
    ///
    /// The first coordinate range error; nothing is returned for the batch
    pub fn encode_batch(
        &self,
        points: &[(f64, f64)],
        precision: GeohashPrecision,
    ) -> AccelResult<Vec<String>> {
        points
            .iter()
            .map(|&(lat, lng)| self.encode(lat, lng, precision))
            .collect()
    }

    /// Encode a flat `[lat, lng, lat, lng, ...]` buffer
    ///
    /// # Errors
    ///
    /// `UnpairedCoordinates` for an odd-length buffer, then coordinate range errors
    pub fn encode_interleaved(
        &self,
        values: &[f64],
        precision: GeohashPrecision,
    ) -> AccelResult<Vec<String>> {
        if values.len() % 2 != 0 {
            return Err(AccelError::UnpairedCoordinates(values.len()));
        }
        values
            .chunks_exact(2)
            .map(|pair| self.encode(pair[0], pair[1], precision))
            .collect()
    }

    /// Distances in meters from `origin` to each target
    ///
    /// # Errors
    ///
    /// The first coordinate range error
    pub fn haversine_batch(
        &self,
        origin: (f64, f64),
        targets: &[(f64, f64)],
    ) -> AccelResult<Vec<f64>> {
        let from = Coordinate::new(origin.0, origin.1)?;
        targets
            .iter()
            .map(|&(lat, lng)| Ok(self.distance(from, Coordinate::new(lat, lng)?)))
            .collect()
    }

    /// Indices of the targets within `radius_meters` of `origin`
    ///
    /// # Errors
    ///
    /// `InvalidRadius`, or the first coordinate range error
    pub fn filter_within_radius(
        &self,
        origin: (f64, f64),
        targets: &[(f64, f64)],
        radius_meters: f64,
    ) -> AccelResult<Vec<usize>> {
        let radius = checked_radius(radius_meters)?;
        let distances = self.haversine_batch(origin, targets)?;
        Ok(distances
            .iter()
            .enumerate()
            .filter(|&(_, &meters)| meters <= radius)
            .map(|(index, _)| index)
            .collect())
    }
}

impl Default for GeoService {
    fn default() -> Self {
        Self::fallback()
    }
}

fn checked_radius(radius_meters: f64) -> AccelResult<f64> {
    if radius_meters.is_finite() && radius_meters >= 0.0 {
        Ok(radius_meters)
    } else {
        Err(AccelError::InvalidRadius(radius_meters))
    }
}
