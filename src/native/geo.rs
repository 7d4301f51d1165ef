// ABOUTME: Safe wrapper over the native geohash codec and distance exports
// ABOUTME: Converts between Rust types and C buffers; a failing call yields None
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::loader::symbol;
use super::ProbeFailure;
use libloading::Library;
use musclemap_core::constants::{abi, geohash::C_BUFFER_LEN, libraries};
use musclemap_core::{BoundingBox, Coordinate, GeohashPrecision};
use std::ffi::{c_char, c_int, CStr, CString};
use std::sync::Arc;

/// One NUL-terminated hash buffer as laid out by `geohash_neighbors`
pub type NeighborBuffer = [c_char; C_BUFFER_LEN];

/// Function pointers of the geo library exports
#[derive(Clone, Copy)]
pub struct GeoSymbols {
    /// `int geohash_encode(double lat, double lng, int precision, char *out)`
    pub geohash_encode: unsafe extern "C" fn(f64, f64, c_int, *mut c_char) -> c_int,
    /// `int geohash_decode(const char *hash, double *lat, double *lng)`
    pub geohash_decode: unsafe extern "C" fn(*const c_char, *mut f64, *mut f64) -> c_int,
    /// `int geohash_neighbors(const char *hash, char out[8][13])`
    pub geohash_neighbors: unsafe extern "C" fn(*const c_char, *mut NeighborBuffer) -> c_int,
    /// `int geohash_precision_error(int precision, double *lat_err, double *lng_err)`
    pub geohash_precision_error: unsafe extern "C" fn(c_int, *mut f64, *mut f64) -> c_int,
    /// `double haversine_meters(double, double, double, double)`
    pub haversine_meters: unsafe extern "C" fn(f64, f64, f64, f64) -> f64,
    /// `int is_within_radius(double, double, double, double, double radius)`
    pub is_within_radius: unsafe extern "C" fn(f64, f64, f64, f64, f64) -> c_int,
    /// `int bounding_box(double lat, double lng, double radius, double *min_lat, ...)`
    #[allow(clippy::type_complexity)]
    pub bounding_box:
        unsafe extern "C" fn(f64, f64, f64, *mut f64, *mut f64, *mut f64, *mut f64) -> c_int,
    /// `int optimal_precision(double radius)`
    pub optimal_precision: unsafe extern "C" fn(f64) -> c_int,
}

impl GeoSymbols {
    /// Resolve every export from a loaded library
    ///
    /// # Errors
    ///
    /// `MissingSymbol` naming the first absent export
    pub fn resolve(library: &Library) -> Result<Self, ProbeFailure> {
        let stem = libraries::GEO;
        // SAFETY: each type matches the corresponding export of musclemap-geo
        unsafe {
            Ok(Self {
                geohash_encode: symbol(library, stem, "geohash_encode")?,
                geohash_decode: symbol(library, stem, "geohash_decode")?,
                geohash_neighbors: symbol(library, stem, "geohash_neighbors")?,
                geohash_precision_error: symbol(library, stem, "geohash_precision_error")?,
                haversine_meters: symbol(library, stem, "haversine_meters")?,
                is_within_radius: symbol(library, stem, "is_within_radius")?,
                bounding_box: symbol(library, stem, "bounding_box")?,
                optimal_precision: symbol(library, stem, "optimal_precision")?,
            })
        }
    }
}

/// Bound native geo library
#[derive(Clone)]
pub struct NativeGeo {
    symbols: GeoSymbols,
    _library: Option<Arc<Library>>,
}

impl NativeGeo {
    /// Bind a loaded library
    ///
    /// # Errors
    ///
    /// `MissingSymbol` when an export is absent
    pub fn bind(library: Arc<Library>) -> Result<Self, ProbeFailure> {
        Ok(Self {
            symbols: GeoSymbols::resolve(&library)?,
            _library: Some(library),
        })
    }

    /// Bind function pointers that are already in the process
    ///
    /// # Safety
    ///
    /// Every pointer must implement the documented C contract of its export
    #[must_use]
    pub unsafe fn from_symbols(symbols: GeoSymbols) -> Self {
        Self {
            symbols,
            _library: None,
        }
    }

    fn c_hash(hash: &str) -> Option<CString> {
        CString::new(hash).ok()
    }

    fn read_buffer(buffer: &[c_char]) -> Option<String> {
        // SAFETY: the library NUL-terminates every buffer it reports success for
        let hash = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        hash.to_str().ok().map(str::to_owned)
    }

    /// `geohash_encode`
    #[must_use]
    pub fn encode(&self, coord: Coordinate, precision: GeohashPrecision) -> Option<String> {
        let mut out: NeighborBuffer = [0; C_BUFFER_LEN];
        // SAFETY: `out` holds the longest hash plus NUL
        let written = unsafe {
            (self.symbols.geohash_encode)(
                coord.lat(),
                coord.lng(),
                c_int::from(precision.get()),
                out.as_mut_ptr(),
            )
        };
        if written != c_int::from(precision.get()) {
            return None;
        }
        Self::read_buffer(&out)
    }

    /// `geohash_decode`
    #[must_use]
    pub fn decode(&self, hash: &str) -> Option<Coordinate> {
        let hash = Self::c_hash(hash)?;
        let (mut lat, mut lng) = (0.0, 0.0);
        // SAFETY: `hash` is NUL-terminated; both outputs are valid stack slots
        let status = unsafe { (self.symbols.geohash_decode)(hash.as_ptr(), &mut lat, &mut lng) };
        if status != abi::OK {
            return None;
        }
        Coordinate::new(lat, lng).ok()
    }

    /// `geohash_neighbors`, ordered N, NE, E, SE, S, SW, W, NW
    #[must_use]
    pub fn neighbors(&self, hash: &str) -> Option<[String; 8]> {
        let hash = Self::c_hash(hash)?;
        let mut out: [NeighborBuffer; 8] = [[0; C_BUFFER_LEN]; 8];
        // SAFETY: `hash` is NUL-terminated; `out` is 8 buffers of 13 bytes
        let status = unsafe { (self.symbols.geohash_neighbors)(hash.as_ptr(), out.as_mut_ptr()) };
        if status != abi::OK {
            return None;
        }
        let mut found: [String; 8] = Default::default();
        for (slot, buffer) in found.iter_mut().zip(&out) {
            *slot = Self::read_buffer(buffer)?;
        }
        Some(found)
    }

    /// `geohash_precision_error`
    #[must_use]
    pub fn precision_error(&self, precision: GeohashPrecision) -> Option<(f64, f64)> {
        let (mut lat_err, mut lng_err) = (0.0, 0.0);
        // SAFETY: both outputs are valid stack slots
        let status = unsafe {
            (self.symbols.geohash_precision_error)(
                c_int::from(precision.get()),
                &mut lat_err,
                &mut lng_err,
            )
        };
        (status == abi::OK).then_some((lat_err, lng_err))
    }

    /// `haversine_meters`
    #[must_use]
    pub fn haversine(&self, from: Coordinate, to: Coordinate) -> Option<f64> {
        // SAFETY: plain value arguments
        let meters =
            unsafe { (self.symbols.haversine_meters)(from.lat(), from.lng(), to.lat(), to.lng()) };
        (meters >= 0.0).then_some(meters)
    }

    /// `is_within_radius`
    #[must_use]
    pub fn is_within_radius(
        &self,
        center: Coordinate,
        point: Coordinate,
        radius_meters: f64,
    ) -> Option<bool> {
        // SAFETY: plain value arguments
        let code = unsafe {
            (self.symbols.is_within_radius)(
                center.lat(),
                center.lng(),
                point.lat(),
                point.lng(),
                radius_meters,
            )
        };
        match code {
            1 => Some(true),
            0 => Some(false),
            _ => None,
        }
    }

    /// `bounding_box`
    #[must_use]
    pub fn bounding_box(&self, center: Coordinate, radius_meters: f64) -> Option<BoundingBox> {
        let mut bbox = BoundingBox {
            min_lat: 0.0,
            max_lat: 0.0,
            min_lng: 0.0,
            max_lng: 0.0,
        };
        // SAFETY: the four outputs are distinct fields of a stack value
        let status = unsafe {
            (self.symbols.bounding_box)(
                center.lat(),
                center.lng(),
                radius_meters,
                &mut bbox.min_lat,
                &mut bbox.max_lat,
                &mut bbox.min_lng,
                &mut bbox.max_lng,
            )
        };
        (status == abi::OK).then_some(bbox)
    }

    /// `optimal_precision`
    #[must_use]
    pub fn optimal_precision(&self, radius_meters: f64) -> Option<GeohashPrecision> {
        // SAFETY: plain value argument
        let level = unsafe { (self.symbols.optimal_precision)(radius_meters) };
        (1..=12)
            .contains(&level)
            .then(|| GeohashPrecision::clamped(i64::from(level)))
    }
}
