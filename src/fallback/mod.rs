// ABOUTME: Pure Rust implementations of the native primitives
// ABOUTME: Used whenever a native library is disabled, missing, or fails at call time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Pure fallbacks
//!
//! Written independently of the native crates but reading the same constant
//! tables, so both paths agree on every output the dispatch layer exposes.

/// Great-circle distance utilities
pub mod distance;

/// Geohash codec
pub mod geohash;

/// Sliding-window rate limiter
pub mod rate_limiter;

pub use rate_limiter::FallbackRateLimiter;
