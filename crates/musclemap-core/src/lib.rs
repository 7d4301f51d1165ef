// ABOUTME: Core types and constants for the MuscleMap native acceleration layer
// ABOUTME: Foundation crate shared by the native libraries and the dispatch layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # `MuscleMap` Core
//!
//! Foundation crate shared by the native geo and rate-limiter libraries and by
//! the dispatch layer that chooses between them and the pure fallbacks. It
//! changes rarely, so both native libraries can be rebuilt independently.
//!
//! ## Modules
//!
//! - **errors**: `AccelError` and the stable `ErrorCode` mapping
//! - **constants**: lookup tables, window geometry, ABI codes, environment keys
//! - **types**: validated coordinates, geohash precision, bounding boxes
//! - **hash**: identity mixing shared by both rate limiter backends

/// Error taxonomy shared by every backend
pub mod errors;

/// Constants organized by domain
pub mod constants;

/// Validated domain types
pub mod types;

/// Identity hashing for slot placement
pub mod hash;

pub use errors::{AccelError, AccelResult, ErrorCode};
pub use hash::mix64;
pub use types::{
    BoundingBox, Coordinate, Decision, Direction, GeohashPrecision, LimitStatus, LimiterStats,
};
