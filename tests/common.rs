// ABOUTME: Shared test utilities for integration tests
// ABOUTME: Binds the in-process native exports and builds services on either backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    unsafe_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `musclemap_accel`
//!
//! The native crates are dev-dependencies, so their `extern "C"` exports are
//! linked into every test binary. Binding those function pointers drives the
//! dispatch layer through the real C ABI without a `dlopen`.

use musclemap_accel::native::{GeoSymbols, NativeGeo, NativeRateLimit, RateLimitSymbols};
use musclemap_accel::{Backend, CapabilityRegistry, FailurePolicy, GeoService, RateLimiter};
use musclemap_geo::ffi as geo_ffi;
use musclemap_ratelimit::ffi as ratelimit_ffi;
use std::env;
use std::ffi::{c_char, c_int, c_void};
use std::ptr;
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Exports of the geo library linked into this binary
pub fn geo_symbols() -> GeoSymbols {
    GeoSymbols {
        geohash_encode: geo_ffi::geohash_encode,
        geohash_decode: geo_ffi::geohash_decode,
        geohash_neighbors: geo_ffi::geohash_neighbors,
        geohash_precision_error: geo_ffi::geohash_precision_error,
        haversine_meters: geo_ffi::haversine_meters,
        is_within_radius: geo_ffi::is_within_radius,
        bounding_box: geo_ffi::bounding_box,
        optimal_precision: geo_ffi::optimal_precision,
    }
}

/// Native geo binding over the linked exports
pub fn native_geo() -> NativeGeo {
    // SAFETY: the symbols are the geo library's own exports
    unsafe { NativeGeo::from_symbols(geo_symbols()) }
}

/// Exports of the rate limiter library linked into this binary
pub fn rate_limit_symbols() -> RateLimitSymbols {
    RateLimitSymbols {
        create: ratelimit_ffi::ratelimit_create,
        create_windowed: ratelimit_ffi::ratelimit_create_windowed,
        destroy: ratelimit_ffi::ratelimit_destroy,
        check: ratelimit_ffi::ratelimit_check,
        remaining: ratelimit_ffi::ratelimit_remaining,
        peek: ratelimit_ffi::ratelimit_peek,
        reset_ms: ratelimit_ffi::ratelimit_reset_ms,
        reset_user: ratelimit_ffi::ratelimit_reset_user,
        clear_all: ratelimit_ffi::ratelimit_clear_all,
        stats: ratelimit_ffi::ratelimit_stats,
    }
}

/// Native rate limiter binding over the linked exports
pub fn native_rate_limit() -> NativeRateLimit {
    // SAFETY: the symbols are the rate limiter library's own exports
    unsafe { NativeRateLimit::from_symbols(rate_limit_symbols()) }
}

/// Geo service for a backend
pub fn geo_service(backend: Backend) -> GeoService {
    match backend {
        Backend::Native => GeoService::native(native_geo()),
        Backend::Fallback => GeoService::fallback(),
    }
}

/// Rate limiter for a backend
pub fn rate_limiter(
    backend: Backend,
    capacity: usize,
    limit: u32,
    policy: FailurePolicy,
) -> RateLimiter {
    let binding = match backend {
        Backend::Native => Some(native_rate_limit()),
        Backend::Fallback => None,
    };
    let limiter = RateLimiter::new(binding.as_ref(), capacity, limit, policy).unwrap();
    assert_eq!(limiter.backend(), backend);
    limiter
}

/// Registry with both native libraries bound in-process
pub fn native_registry(policy: FailurePolicy) -> CapabilityRegistry {
    CapabilityRegistry::from_bindings(Some(native_geo()), Some(native_rate_limit()), policy)
}

/// Both backends, native first
pub const BACKENDS: [Backend; 2] = [Backend::Native, Backend::Fallback];

extern "C" fn failing_encode(_: f64, _: f64, _: c_int, _: *mut c_char) -> c_int {
    -1
}

extern "C" fn failing_decode(_: *const c_char, _: *mut f64, _: *mut f64) -> c_int {
    -1
}

extern "C" fn failing_neighbors(_: *const c_char, _: *mut [c_char; 13]) -> c_int {
    -1
}

extern "C" fn failing_precision_error(_: c_int, _: *mut f64, _: *mut f64) -> c_int {
    -1
}

extern "C" fn failing_haversine(_: f64, _: f64, _: f64, _: f64) -> f64 {
    -1.0
}

extern "C" fn failing_within(_: f64, _: f64, _: f64, _: f64, _: f64) -> c_int {
    -1
}

#[allow(clippy::too_many_arguments)]
extern "C" fn failing_bounding_box(
    _: f64,
    _: f64,
    _: f64,
    _: *mut f64,
    _: *mut f64,
    _: *mut f64,
    _: *mut f64,
) -> c_int {
    -1
}

extern "C" fn failing_optimal_precision(_: f64) -> c_int {
    0
}

/// Native geo binding whose every call reports failure
pub fn failing_geo() -> NativeGeo {
    let symbols = GeoSymbols {
        geohash_encode: failing_encode,
        geohash_decode: failing_decode,
        geohash_neighbors: failing_neighbors,
        geohash_precision_error: failing_precision_error,
        haversine_meters: failing_haversine,
        is_within_radius: failing_within,
        bounding_box: failing_bounding_box,
        optimal_precision: failing_optimal_precision,
    };
    // SAFETY: the stubs never touch their pointer arguments
    unsafe { NativeGeo::from_symbols(symbols) }
}

extern "C" fn null_create(_: usize, _: u32) -> *mut c_void {
    ptr::null_mut()
}

extern "C" fn null_create_windowed(_: usize, _: u32, _: u32) -> *mut c_void {
    ptr::null_mut()
}

/// Native rate limiter binding that refuses to allocate tables
pub fn null_rate_limit() -> NativeRateLimit {
    let symbols = RateLimitSymbols {
        create: null_create,
        create_windowed: null_create_windowed,
        ..rate_limit_symbols()
    };
    // SAFETY: only the constructors are replaced, and they never return a handle
    unsafe { NativeRateLimit::from_symbols(symbols) }
}
