// ABOUTME: Property tests asserting the native and fallback backends give the same answers
// ABOUTME: Geohash outputs and limiter decisions match exactly; distances within tolerance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{geo_service, native_rate_limit, rate_limiter, BACKENDS};
use musclemap_accel::{Backend, FailurePolicy, GeohashPrecision, RateLimiter};
use proptest::prelude::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-7_f64.mul_add(a.abs().max(b.abs()), 1e-6)
}

fn geohash_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[0-9b-hjkmnp-z]{1,12}").unwrap()
}

proptest! {
    #[test]
    fn prop_encode_matches(
        lat in -90.0f64..=90.0f64,
        lng in -180.0f64..=180.0f64,
        precision in 1i64..=12,
    ) {
        let precision = GeohashPrecision::clamped(precision);
        let native = geo_service(Backend::Native).encode(lat, lng, precision).unwrap();
        let fallback = geo_service(Backend::Fallback).encode(lat, lng, precision).unwrap();
        prop_assert_eq!(native, fallback);
    }

    #[test]
    fn prop_decode_matches(hash in geohash_strategy()) {
        let native = geo_service(Backend::Native).decode(&hash).unwrap();
        let fallback = geo_service(Backend::Fallback).decode(&hash).unwrap();
        prop_assert_eq!(native, fallback);
    }

    #[test]
    fn prop_encoded_point_lies_in_decoded_cell(
        lat in -89.0f64..89.0f64,
        lng in -179.0f64..179.0f64,
        precision in 1i64..=12,
    ) {
        let geo = geo_service(Backend::Native);
        let precision = GeohashPrecision::clamped(precision);
        let hash = geo.encode(lat, lng, precision).unwrap();
        let center = geo.decode(&hash).unwrap();
        let (lat_err, lng_err) = geo.precision_error(precision);
        prop_assert!((center.lat() - lat).abs() <= lat_err);
        prop_assert!((center.lng() - lng).abs() <= lng_err);
    }

    #[test]
    fn prop_longer_hashes_refine_shorter_ones(
        lat in -90.0f64..=90.0f64,
        lng in -180.0f64..=180.0f64,
    ) {
        for backend in BACKENDS {
            let geo = geo_service(backend);
            let mut coarser = String::new();
            for precision in GeohashPrecision::levels() {
                let hash = geo.encode(lat, lng, precision).unwrap();
                prop_assert!(hash.starts_with(&coarser), "{} {} !~ {}", backend, hash, coarser);
                coarser = hash;
            }
        }
    }

    #[test]
    fn prop_neighbors_match_away_from_poles(
        lat in -80.0f64..80.0f64,
        lng in -180.0f64..=180.0f64,
        precision in 1i64..=12,
    ) {
        let precision = GeohashPrecision::clamped(precision);
        let fallback = geo_service(Backend::Fallback);
        let hash = fallback.encode(lat, lng, precision).unwrap();
        let native = geo_service(Backend::Native).neighbors(&hash).unwrap();
        prop_assert_eq!(native, fallback.neighbors(&hash).unwrap());
    }

    #[test]
    fn prop_haversine_matches(
        lat1 in -90.0f64..=90.0f64,
        lng1 in -180.0f64..=180.0f64,
        lat2 in -90.0f64..=90.0f64,
        lng2 in -180.0f64..=180.0f64,
    ) {
        let native = geo_service(Backend::Native).haversine(lat1, lng1, lat2, lng2).unwrap();
        let fallback = geo_service(Backend::Fallback).haversine(lat1, lng1, lat2, lng2).unwrap();
        prop_assert!(close(native, fallback), "{} vs {}", native, fallback);
        prop_assert!(native >= 0.0);
    }

    #[test]
    fn prop_bounding_box_matches(
        lat in -89.0f64..89.0f64,
        lng in -180.0f64..=180.0f64,
        radius in 0.0f64..500_000.0,
    ) {
        let native = geo_service(Backend::Native).bounding_box(lat, lng, radius).unwrap();
        let fallback = geo_service(Backend::Fallback).bounding_box(lat, lng, radius).unwrap();
        prop_assert!(close(native.min_lat, fallback.min_lat));
        prop_assert!(close(native.max_lat, fallback.max_lat));
        prop_assert!(close(native.min_lng, fallback.min_lng));
        prop_assert!(close(native.max_lng, fallback.max_lng));
        prop_assert!(native.contains(lat, lng));
    }

    #[test]
    fn prop_optimal_precision_matches(radius in -10.0f64..6_000_000.0) {
        prop_assert_eq!(
            geo_service(Backend::Native).optimal_precision(radius),
            geo_service(Backend::Fallback).optimal_precision(radius)
        );
    }

    #[test]
    fn prop_limiters_agree_on_request_sequences(
        capacity in 1usize..64,
        limit in 1u32..10,
        requests in proptest::collection::vec((1u64..200, 1u32..5), 1..300),
    ) {
        // Up to 199 identities over at most 63 slots: saturation is routine
        let native = rate_limiter(Backend::Native, capacity, limit, FailurePolicy::Closed);
        let fallback = rate_limiter(Backend::Fallback, capacity, limit, FailurePolicy::Closed);
        for (identity, count) in requests {
            prop_assert_eq!(native.check(identity, count), fallback.check(identity, count));
            prop_assert_eq!(native.remaining(identity), fallback.remaining(identity));
        }
        prop_assert_eq!(native.stats(), fallback.stats());
    }

    #[test]
    fn prop_windowed_limiters_agree(
        capacity in 1usize..32,
        window_seconds in 10u32..=3_600,
        requests in proptest::collection::vec((1u64..60, 1u32..4), 1..120),
    ) {
        let binding = native_rate_limit();
        let native = RateLimiter::with_window(
            Some(&binding), capacity, 6, window_seconds, FailurePolicy::Closed,
        ).unwrap();
        let fallback = RateLimiter::fallback_with_window(capacity, 6, window_seconds).unwrap();
        prop_assert_eq!(native.backend(), Backend::Native);
        for (identity, count) in requests {
            let before = (native.peek(identity).unwrap(), fallback.peek(identity).unwrap());
            prop_assert_eq!(before.0.allowed, before.1.allowed);
            prop_assert_eq!(before.0.remaining, before.1.remaining);
            prop_assert_eq!(native.check(identity, count), fallback.check(identity, count));
        }
        prop_assert_eq!(native.stats(), fallback.stats());
    }
}
