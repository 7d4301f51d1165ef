// ABOUTME: Error taxonomy for the acceleration layer with stable error codes
// ABOUTME: Separates terminal input errors from rate limiter capacity exhaustion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Acceleration Error Types
//!
//! Every fallible operation of the geohash codec, the distance utilities and
//! the rate limiter returns [`AccelError`]. Native-backend unavailability is
//! not an error at this level; the dispatch layer absorbs it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes, numbered in the same ranges as the platform API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    /// Structurally invalid argument
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    /// Malformed encoded value
    #[serde(rename = "INVALID_FORMAT")]
    InvalidFormat = 3002,
    /// Numeric argument outside its domain
    #[serde(rename = "VALUE_OUT_OF_RANGE")]
    ValueOutOfRange = 3003,

    // Resource Management (4000-4999)
    /// A bounded resource could not serve the request
    #[serde(rename = "RESOURCE_UNAVAILABLE")]
    ResourceUnavailable = 4003,
}

impl ErrorCode {
    /// Stable wire name of the code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::ValueOutOfRange => "VALUE_OUT_OF_RANGE",
            Self::ResourceUnavailable => "RESOURCE_UNAVAILABLE",
        }
    }
}

/// Errors returned by the acceleration layer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccelError {
    /// Latitude is NaN or outside [-90, 90]
    #[error("invalid latitude {0}: expected a value within [-90, 90]")]
    InvalidLatitude(f64),

    /// Longitude is NaN or outside [-180, 180]
    #[error("invalid longitude {0}: expected a value within [-180, 180]")]
    InvalidLongitude(f64),

    /// Geohash is empty or longer than 12 symbols
    #[error("invalid geohash length {0}: expected 1 to 12 symbols")]
    InvalidGeohashLength(usize),

    /// Geohash contains a symbol outside the base-32 alphabet
    #[error("invalid geohash character {character:?} at position {position}")]
    InvalidGeohashCharacter {
        /// Offending character
        character: char,
        /// Zero-based character position
        position: usize,
    },

    /// Radius is NaN, infinite or negative
    #[error("invalid radius {0}: expected a finite, non-negative number of meters")]
    InvalidRadius(f64),

    /// Flat coordinate buffer has an odd number of values
    #[error("coordinate buffer has {0} values; expected latitude/longitude pairs")]
    UnpairedCoordinates(usize),

    /// Rate-limit request for zero units
    #[error("request count must be greater than zero")]
    ZeroCount,

    /// Identity 0 marks empty slots and cannot be tracked
    #[error("identity 0 is reserved for unclaimed slots")]
    ReservedIdentity,

    /// Window length outside 1 to 3600 seconds
    #[error("invalid rate limit window {0}s: expected 1 to 3600 seconds")]
    InvalidWindow(u32),

    /// Rate limiter constructed without slots
    #[error("rate limiter capacity must be greater than zero")]
    ZeroCapacity,

    /// No slot could be found or claimed within the probe bound
    #[error("rate limiter table saturated: no slot for identity {identity} within {probes} probes")]
    CapacityExhausted {
        /// Identity that could not be placed
        identity: u64,
        /// Probe bound that was exhausted
        probes: usize,
    },
}

impl AccelError {
    /// Error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidLatitude(_)
            | Self::InvalidLongitude(_)
            | Self::InvalidRadius(_)
            | Self::InvalidWindow(_) => ErrorCode::ValueOutOfRange,
            Self::InvalidGeohashLength(_) | Self::InvalidGeohashCharacter { .. } => {
                ErrorCode::InvalidFormat
            }
            Self::UnpairedCoordinates(_)
            | Self::ZeroCount
            | Self::ReservedIdentity
            | Self::ZeroCapacity => ErrorCode::InvalidInput,
            Self::CapacityExhausted { .. } => ErrorCode::ResourceUnavailable,
        }
    }

    /// Whether the rate limiter ran out of slots (as opposed to bad input)
    #[must_use]
    pub const fn is_capacity_exhausted(&self) -> bool {
        matches!(self, Self::CapacityExhausted { .. })
    }
}

/// Result type used across the acceleration layer
pub type AccelResult<T> = Result<T, AccelError>;
