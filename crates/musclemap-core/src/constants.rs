// ABOUTME: Constants module with domain-separated organization for the acceleration layer
// ABOUTME: Geohash tables, Earth geometry, limiter window geometry, ABI codes, environment keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped by domain. Both native libraries and the pure
//! fallbacks read the same tables so that the two code paths cannot drift.

/// Geohash alphabet, precision bounds, and per-level error tables
pub mod geohash {
    /// Base-32 alphabet (digits and lower-case letters without a, i, l, o)
    pub const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

    /// Bits encoded by a single base-32 symbol
    pub const BITS_PER_SYMBOL: u32 = 5;

    /// Coarsest supported precision
    pub const MIN_PRECISION: u8 = 1;

    /// Finest supported precision
    pub const MAX_PRECISION: u8 = 12;

    /// Precision used when callers do not ask for one
    pub const DEFAULT_PRECISION: u8 = 9;

    /// Latitude half-error (degrees) for precision levels 1..=12
    ///
    /// Half the height of a cell: `90 / 2^floor(5p / 2)`.
    pub const LAT_ERROR: [f64; 12] = [
        22.5,
        2.8125,
        0.703_125,
        0.087_890_625,
        0.021_972_656_25,
        0.002_746_582_031_25,
        0.000_686_645_507_812_5,
        8.583_068_847_656_25e-5,
        2.145_767_211_914_062_5e-5,
        2.682_209_014_892_578e-6,
        6.705_522_537_231_445e-7,
        8.381_903_171_539_307e-8,
    ];

    /// Longitude half-error (degrees) for precision levels 1..=12
    ///
    /// Half the width of a cell: `180 / 2^ceil(5p / 2)`.
    pub const LNG_ERROR: [f64; 12] = [
        22.5,
        5.625,
        0.703_125,
        0.175_781_25,
        0.021_972_656_25,
        0.005_493_164_062_5,
        0.000_686_645_507_812_5,
        0.000_171_661_376_953_125,
        2.145_767_211_914_062_5e-5,
        5.364_418_029_785_156e-6,
        6.705_522_537_231_445e-7,
        1.676_380_634_307_861_3e-7,
    ];

    /// Approximate cell widths in meters for precision levels 1..=12
    pub const CELL_WIDTHS_METERS: [f64; 12] = [
        5_009_400.0, // ~5009 km
        1_252_350.0, // ~1252 km
        156_543.0,   // ~157 km
        39_135.8,    // ~39 km
        4_891.97,    // ~4.9 km
        1_222.99,    // ~1.2 km
        152.87,      // ~153 m
        38.22,       // ~38 m
        4.78,        // ~4.8 m
        1.19,        // ~1.2 m
        0.149,       // ~15 cm
        0.037,       // ~3.7 cm
    ];

    /// Byte length of a C buffer holding the longest hash plus NUL
    pub const C_BUFFER_LEN: usize = MAX_PRECISION as usize + 1;
}

/// Earth geometry
pub mod earth {
    /// Mean Earth radius in meters
    pub const RADIUS_METERS: f64 = 6_371_000.0;

    /// Valid latitude range in degrees
    pub const MIN_LAT: f64 = -90.0;
    /// Valid latitude range in degrees
    pub const MAX_LAT: f64 = 90.0;

    /// Valid longitude range in degrees
    pub const MIN_LNG: f64 = -180.0;
    /// Valid longitude range in degrees
    pub const MAX_LNG: f64 = 180.0;
}

/// Sliding-window rate limiter geometry
pub mod rate_limit {
    /// Window length in seconds when none is given; one bucket per second
    pub const DEFAULT_WINDOW_SECONDS: u32 = 60;

    /// Longest supported window (one hour)
    pub const MAX_WINDOW_SECONDS: u32 = 3_600;

    /// Linear probes attempted before a lookup gives up
    pub const MAX_PROBES: usize = 8;

    /// Slot identity marking an unclaimed slot
    pub const EMPTY_IDENTITY: u64 = 0;

    /// Default slot count for limiters built from configuration
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// Default requests per window for limiters built from configuration
    pub const DEFAULT_LIMIT: u32 = 60;
}

/// Return codes of the C ABI exported by the native libraries
pub mod abi {
    /// Rate-limit check allowed the request
    pub const ALLOWED: i32 = 1;
    /// Rate-limit check denied the request; also the generic success code
    pub const DENIED: i32 = 0;
    /// Generic success for status-returning functions
    pub const OK: i32 = 0;
    /// Geo invalid input, or rate limiter capacity exhaustion
    pub const ERROR: i32 = -1;
    /// Rate limiter rejected its arguments (null handle, zero count, identity 0)
    pub const INVALID_ARGUMENT: i32 = -2;
}

/// Shared-library stems resolved by the dynamic loader
pub mod libraries {
    /// Geohash codec and distance utilities
    pub const GEO: &str = "musclemap_geo";
    /// Concurrent sliding-window rate limiter
    pub const RATE_LIMIT: &str = "musclemap_ratelimit";
}

/// Environment variable names read by the configuration layer
pub mod env_config {
    /// Forces fallback-only mode when set to a truthy value
    pub const DISABLE_NATIVE: &str = "MUSCLEMAP_DISABLE_NATIVE";
    /// Directory containing the native shared libraries
    pub const NATIVE_DIR: &str = "MUSCLEMAP_NATIVE_DIR";
    /// `closed` or `open`
    pub const FAILURE_POLICY: &str = "MUSCLEMAP_RATELIMIT_FAILURE_POLICY";
    /// Default limiter capacity
    pub const RATELIMIT_CAPACITY: &str = "MUSCLEMAP_RATELIMIT_CAPACITY";
    /// Default limiter per-window limit
    pub const RATELIMIT_LIMIT: &str = "MUSCLEMAP_RATELIMIT_LIMIT";
    /// Default limiter window length in seconds
    pub const RATELIMIT_WINDOW: &str = "MUSCLEMAP_RATELIMIT_WINDOW_SECONDS";
}
