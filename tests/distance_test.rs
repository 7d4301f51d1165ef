// ABOUTME: Integration tests for the dispatched distance utilities on both backends
// ABOUTME: Haversine accuracy, radius checks, bounding boxes, precision selection, batch helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{failing_geo, geo_service, init_test_logging, BACKENDS};
use musclemap_accel::{AccelError, GeoService};

const NYC: (f64, f64) = (40.7128, -74.0060);
const LA: (f64, f64) = (34.0522, -118.2437);
const LONDON: (f64, f64) = (51.5074, -0.1278);
const PARIS: (f64, f64) = (48.8566, 2.3522);

#[test]
fn test_haversine_known_distances() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        let degree = geo.haversine(0.0, 0.0, 1.0, 0.0).unwrap();
        assert!((degree - 111_194.93).abs() < 1.0, "{backend}: {degree}");

        let coast = geo.haversine(NYC.0, NYC.1, LA.0, LA.1).unwrap();
        assert!((3_900_000.0..4_000_000.0).contains(&coast), "{backend}: {coast}");

        let channel = geo.haversine(LONDON.0, LONDON.1, PARIS.0, PARIS.1).unwrap();
        assert!((340_000.0..347_000.0).contains(&channel), "{backend}: {channel}");
    }
}

#[test]
fn test_haversine_is_symmetric_and_zero_on_self() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        let there = geo.haversine(NYC.0, NYC.1, LONDON.0, LONDON.1).unwrap();
        let back = geo.haversine(LONDON.0, LONDON.1, NYC.0, NYC.1).unwrap();
        assert!((there - back).abs() < 1e-6, "{backend}");
        assert!(geo.haversine(NYC.0, NYC.1, NYC.0, NYC.1).unwrap().abs() < f64::EPSILON);
    }
}

#[test]
fn test_haversine_antipodes_stay_finite() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        let half_circumference = std::f64::consts::PI * 6_371_000.0;
        let meters = geo.haversine(0.0, 0.0, 0.0, 180.0).unwrap();
        assert!(meters.is_finite(), "{backend}");
        assert!((meters - half_circumference).abs() < 1.0, "{backend}: {meters}");
        let poles = geo.haversine(90.0, 0.0, -90.0, 0.0).unwrap();
        assert!((poles - half_circumference).abs() < 1.0, "{backend}: {poles}");
    }
}

#[test]
fn test_haversine_rejects_invalid_coordinates() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        assert_eq!(
            geo.haversine(91.0, 0.0, 0.0, 0.0),
            Err(AccelError::InvalidLatitude(91.0))
        );
        assert_eq!(
            geo.haversine(0.0, 0.0, 0.0, 200.0),
            Err(AccelError::InvalidLongitude(200.0))
        );
    }
}

#[test]
fn test_is_within_radius() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        assert_eq!(geo.is_within_radius(0.0, 0.0, 0.0, 0.001, 200.0), Ok(true));
        assert_eq!(geo.is_within_radius(0.0, 0.0, 0.0, 0.001, 100.0), Ok(false));
        assert_eq!(geo.is_within_radius(NYC.0, NYC.1, NYC.0, NYC.1, 0.0), Ok(true));
        assert_eq!(
            geo.is_within_radius(0.0, 0.0, 0.0, 0.0, -1.0),
            Err(AccelError::InvalidRadius(-1.0))
        );
        assert!(matches!(
            geo.is_within_radius(0.0, 0.0, 0.0, 0.0, f64::NAN),
            Err(AccelError::InvalidRadius(_))
        ));
    }
}

#[test]
fn test_bounding_box_at_equator() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        let bbox = geo.bounding_box(0.0, 0.0, 111_194.93).unwrap();
        assert!((bbox.max_lat - 1.0).abs() < 1e-4, "{backend}");
        assert!((bbox.min_lat + 1.0).abs() < 1e-4, "{backend}");
        assert!((bbox.max_lng - 1.0).abs() < 1e-4, "{backend}");
        assert!((bbox.min_lng + 1.0).abs() < 1e-4, "{backend}");
    }
}

#[test]
fn test_bounding_box_contains_the_circle() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        let radius = 5_000.0;
        let bbox = geo.bounding_box(LONDON.0, LONDON.1, radius).unwrap();
        assert!(bbox.contains(LONDON.0, LONDON.1));
        assert!(bbox.max_lng - bbox.min_lng > bbox.max_lat - bbox.min_lat);

        for edge in [
            (bbox.max_lat, LONDON.1),
            (bbox.min_lat, LONDON.1),
            (LONDON.0, bbox.max_lng),
            (LONDON.0, bbox.min_lng),
        ] {
            let meters = geo.haversine(LONDON.0, LONDON.1, edge.0, edge.1).unwrap();
            assert!(meters >= radius - 1.0, "{backend}: {meters}");
        }
    }
}

#[test]
fn test_bounding_box_clamps_latitude_but_not_longitude() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        let polar = geo.bounding_box(89.9, 0.0, 50_000.0).unwrap();
        assert!((polar.max_lat - 90.0).abs() < f64::EPSILON, "{backend}");
        assert!(polar.min_lat < 89.9);

        let dateline = geo.bounding_box(0.0, 179.9, 50_000.0).unwrap();
        assert!(dateline.max_lng > 180.0, "{backend}");

        assert!(matches!(
            geo.bounding_box(0.0, 0.0, f64::INFINITY),
            Err(AccelError::InvalidRadius(_))
        ));
    }
}

#[test]
fn test_optimal_precision() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        let expected = [
            (10_000_000.0, 1),
            (5_009_400.0, 1),
            (5_000_000.0, 2),
            (100_000.0, 4),
            (1_300.0, 6),
            (1_000.0, 7),
            (10.0, 9),
            (3.0, 10),
            (0.0, 12),
            (-50.0, 12),
        ];
        for (radius, level) in expected {
            assert_eq!(
                geo.optimal_precision(radius).get(),
                level,
                "{backend} radius {radius}"
            );
        }
        assert_eq!(geo.optimal_precision(f64::NAN).get(), 12, "{backend}");
    }
}

#[test]
fn test_batch_distances_and_filter() {
    for backend in BACKENDS {
        let geo = geo_service(backend);
        let targets = [LONDON, PARIS, NYC];
        let meters = geo.haversine_batch(LONDON, &targets).unwrap();
        assert_eq!(meters.len(), 3);
        assert!(meters[0].abs() < f64::EPSILON);
        assert!(meters[1] < meters[2]);

        let near = geo.filter_within_radius(LONDON, &targets, 400_000.0).unwrap();
        assert_eq!(near, vec![0, 1], "{backend}");

        assert_eq!(
            geo.haversine_batch((0.0, 0.0), &[(0.0, 0.0), (0.0, 181.0)]),
            Err(AccelError::InvalidLongitude(181.0))
        );
        assert!(geo.filter_within_radius(LONDON, &targets, -1.0).is_err());
    }
}

#[test]
fn test_failing_native_distance_answers_from_fallback() {
    init_test_logging();
    let broken = GeoService::native(failing_geo());
    let fallback = GeoService::fallback();

    assert_eq!(
        broken.haversine(NYC.0, NYC.1, LA.0, LA.1),
        fallback.haversine(NYC.0, NYC.1, LA.0, LA.1)
    );
    assert_eq!(
        broken.is_within_radius(0.0, 0.0, 0.0, 0.001, 200.0),
        Ok(true)
    );
    assert_eq!(
        broken.bounding_box(LONDON.0, LONDON.1, 1_000.0),
        fallback.bounding_box(LONDON.0, LONDON.1, 1_000.0)
    );
    assert_eq!(
        broken.optimal_precision(1_000.0),
        fallback.optimal_precision(1_000.0)
    );
}
