// ABOUTME: Main library entry point for the MuscleMap native acceleration layer
// ABOUTME: Dispatches geohash, distance, and rate limiting to native libraries or pure fallbacks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - deny(unsafe_code): only `native` opts out, for symbol binding and C ABI calls
#![deny(unsafe_code)]

//! # `MuscleMap` Acceleration
//!
//! Hot-path primitives for the `MuscleMap` backend, each served by a native
//! shared library when one can be loaded and by a pure Rust fallback
//! otherwise. Callers see identical results either way.
//!
//! ## Features
//!
//! - **Geohash codec**: encode, decode, neighbors, precision errors
//! - **Distance**: haversine, radius tests, bounding boxes, precision selection
//! - **Rate limiting**: concurrent sliding window per identity (60 seconds by default)
//! - **Capability dispatch**: one probe per registry, reasons recorded and logged
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use musclemap_accel::{CapabilityRegistry, GeohashPrecision};
//! use musclemap_accel::errors::AccelResult;
//!
//! fn main() -> AccelResult<()> {
//!     let registry = CapabilityRegistry::global();
//!     let geo = registry.geo();
//!     let hash = geo.encode(40.7128, -74.0060, GeohashPrecision::default())?;
//!     println!("{hash} via {}", geo.backend());
//!
//!     let limiter = registry.rate_limiter_from_config()?;
//!     if limiter.admit(42, 1) {
//!         println!("admitted");
//!     }
//!     Ok(())
//! }
//! ```

/// Environment configuration
pub mod config;

/// Pure Rust fallbacks
pub mod fallback;

/// Dispatched geohash and distance service
pub mod geo;

/// Structured logging setup
pub mod logging;

/// Native library bindings
pub mod native;

/// Dispatched rate limiter
pub mod rate_limiter;

/// Capability probing and backend selection
pub mod registry;

/// Shared constants
pub use musclemap_core::constants;

/// Error taxonomy
pub use musclemap_core::errors;

pub use config::{AccelConfig, FailurePolicy};
pub use geo::GeoService;
pub use musclemap_core::{
    AccelError, AccelResult, BoundingBox, Coordinate, Decision, Direction, ErrorCode,
    GeohashPrecision, LimitStatus, LimiterStats,
};
pub use rate_limiter::RateLimiter;
pub use registry::{Backend, CapabilityRegistry, CapabilityReport, LibraryStatus};
