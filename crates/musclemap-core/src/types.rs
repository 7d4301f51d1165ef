// ABOUTME: Validated domain types shared by the native libraries and the fallbacks
// ABOUTME: Coordinates, geohash precision, bounding boxes, compass directions, limiter outcomes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::{earth, geohash};
use crate::errors::{AccelError, AccelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A latitude/longitude pair that has passed range validation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    /// Validate and build a coordinate
    ///
    /// # Errors
    ///
    /// Returns `InvalidLatitude` / `InvalidLongitude` for NaN or out-of-range values
    pub fn new(lat: f64, lng: f64) -> AccelResult<Self> {
        if !(earth::MIN_LAT..=earth::MAX_LAT).contains(&lat) {
            return Err(AccelError::InvalidLatitude(lat));
        }
        if !(earth::MIN_LNG..=earth::MAX_LNG).contains(&lng) {
            return Err(AccelError::InvalidLongitude(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees
    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    /// Longitude in degrees
    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// Number of base-32 symbols in a geohash, always within [1, 12]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeohashPrecision(u8);

impl GeohashPrecision {
    /// Coarsest precision
    pub const MIN: Self = Self(geohash::MIN_PRECISION);
    /// Finest precision
    pub const MAX: Self = Self(geohash::MAX_PRECISION);

    /// Clamp any integer into the supported range
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(
            i64::from(geohash::MIN_PRECISION),
            i64::from(geohash::MAX_PRECISION),
        );
        // Safe: clamped into 1..=12
        Self(clamped as u8)
    }

    /// Validate a geohash string and return its precision
    ///
    /// Symbols are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGeohashLength` for empty or over-long input and
    /// `InvalidGeohashCharacter` for symbols outside the alphabet
    pub fn for_hash(hash: &str) -> AccelResult<Self> {
        let len = hash.chars().count();
        if !(usize::from(geohash::MIN_PRECISION)..=usize::from(geohash::MAX_PRECISION))
            .contains(&len)
        {
            return Err(AccelError::InvalidGeohashLength(len));
        }
        for (position, character) in hash.chars().enumerate() {
            let known = character.is_ascii()
                && geohash::BASE32.contains(&(character.to_ascii_lowercase() as u8));
            if !known {
                return Err(AccelError::InvalidGeohashCharacter {
                    character,
                    position,
                });
            }
        }
        // Safe: length checked against 1..=12 above
        Ok(Self(len as u8))
    }

    /// Symbol count
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Symbol count as a buffer length
    #[must_use]
    pub const fn len(self) -> usize {
        self.0 as usize
    }

    /// Always false; a precision has at least one symbol
    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }

    const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// Latitude half-error of a cell at this precision, in degrees
    #[must_use]
    pub const fn lat_error(self) -> f64 {
        geohash::LAT_ERROR[self.index()]
    }

    /// Longitude half-error of a cell at this precision, in degrees
    #[must_use]
    pub const fn lng_error(self) -> f64 {
        geohash::LNG_ERROR[self.index()]
    }

    /// Average cell width at this precision, in meters
    #[must_use]
    pub const fn cell_width_meters(self) -> f64 {
        geohash::CELL_WIDTHS_METERS[self.index()]
    }

    /// Every precision level, coarsest first
    pub fn levels() -> impl Iterator<Item = Self> {
        (geohash::MIN_PRECISION..=geohash::MAX_PRECISION).map(Self)
    }
}

impl Default for GeohashPrecision {
    fn default() -> Self {
        Self(geohash::DEFAULT_PRECISION)
    }
}

impl fmt::Display for GeohashPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compass direction of a neighboring geohash cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// North
    N,
    /// North-east
    NE,
    /// East
    E,
    /// South-east
    SE,
    /// South
    S,
    /// South-west
    SW,
    /// West
    W,
    /// North-west
    NW,
}

impl Direction {
    /// Order in which neighbor lists are produced
    pub const ALL: [Self; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    /// Unit (latitude, longitude) offset of this direction
    #[must_use]
    pub const fn offset(self) -> (f64, f64) {
        match self {
            Self::N => (1.0, 0.0),
            Self::NE => (1.0, 1.0),
            Self::E => (0.0, 1.0),
            Self::SE => (-1.0, 1.0),
            Self::S => (-1.0, 0.0),
            Self::SW => (-1.0, -1.0),
            Self::W => (0.0, -1.0),
            Self::NW => (1.0, -1.0),
        }
    }
}

/// Axis-aligned box around a center point
///
/// Longitude bounds are not wrapped; boxes crossing the antimeridian extend
/// past ±180 and callers must split them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge, clamped to -90
    pub min_lat: f64,
    /// Northern edge, clamped to 90
    pub max_lat: f64,
    /// Western edge
    pub min_lng: f64,
    /// Eastern edge
    pub max_lng: f64,
}

impl BoundingBox {
    /// Whether a point lies inside the box (edges inclusive)
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}

/// Quota decision of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Request admitted and counted
    Allowed,
    /// Request would exceed the window limit; nothing was counted
    Denied,
}

impl Decision {
    /// Whether the request was admitted
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Non-consuming view of one identity's window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStatus {
    /// Whether at least one more request would currently be admitted
    pub allowed: bool,
    /// Requests counted in the live window
    pub current: u32,
    /// Requests still admissible in the live window
    pub remaining: u32,
    /// Configured per-window limit
    pub limit: u32,
    /// Milliseconds until the oldest counted request leaves the window; 0 if none
    pub reset_after_ms: u64,
}

impl LimitStatus {
    /// Status from the remaining quota of a window
    #[must_use]
    pub const fn from_remaining(limit: u32, remaining: u32, reset_after_ms: u64) -> Self {
        let current = limit.saturating_sub(remaining);
        Self {
            allowed: current < limit,
            current,
            remaining,
            limit,
            reset_after_ms,
        }
    }
}

/// Table-wide counters of a rate limiter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterStats {
    /// Identities currently holding a slot
    pub active_identities: usize,
    /// Requests recorded within the live window across all identities
    pub total_requests: u64,
}
