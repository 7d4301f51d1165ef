// ABOUTME: C ABI exports of the geohash codec and distance utilities
// ABOUTME: Validates raw arguments and reports failures through negative return codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! C ABI exports
//!
//! Every function returns a negative value on invalid input. Output buffers
//! are owned by the caller; nothing is allocated across the boundary.

// The exported symbols and raw-pointer handling are the only unsafe surface of this crate
#![allow(unsafe_code)]

use crate::distance;
use crate::geohash::{self, HashBuffer};
use musclemap_core::constants::{abi, geohash::C_BUFFER_LEN};
use musclemap_core::{Coordinate, GeohashPrecision};
use std::ffi::{c_char, c_int, CStr};
use std::slice;

/// One NUL-terminated neighbor slot in `geohash_neighbors` output
pub type NeighborBuffer = [c_char; C_BUFFER_LEN];

/// Borrow a NUL-terminated C string as bytes
///
/// # Safety
///
/// `hash` must be null or point to a NUL-terminated string valid for `'a`
unsafe fn c_bytes<'a>(hash: *const c_char) -> Option<&'a [u8]> {
    if hash.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller contract
    Some(unsafe { CStr::from_ptr(hash) }.to_bytes())
}

/// Copy `symbols` plus a trailing NUL into a C buffer
///
/// # Safety
///
/// `out` must be valid for `symbols.len() + 1` bytes of writes
unsafe fn write_c_string(symbols: &[u8], out: *mut c_char) {
    // SAFETY: capacity guaranteed by the caller contract
    let target = unsafe { slice::from_raw_parts_mut(out.cast::<u8>(), symbols.len() + 1) };
    target[..symbols.len()].copy_from_slice(symbols);
    target[symbols.len()] = 0;
}

fn symbol_count(written: usize) -> c_int {
    c_int::try_from(written).unwrap_or(abi::ERROR)
}

/// Encode a coordinate into `out` (at least `precision + 1` bytes)
///
/// Precision is clamped into [1, 12]. Returns the number of symbols written,
/// or -1 for out-of-range coordinates or a null buffer.
///
/// # Safety
///
/// `out` must be null or valid for 13 bytes of writes
#[no_mangle]
pub unsafe extern "C" fn geohash_encode(
    lat: f64,
    lng: f64,
    precision: c_int,
    out: *mut c_char,
) -> c_int {
    if out.is_null() {
        return abi::ERROR;
    }
    let Ok(coord) = Coordinate::new(lat, lng) else {
        return abi::ERROR;
    };
    let mut buffer = HashBuffer::default();
    let written = geohash::encode_into(
        coord,
        GeohashPrecision::clamped(i64::from(precision)),
        &mut buffer,
    );
    // SAFETY: `out` holds at least precision + 1 bytes
    unsafe { write_c_string(&buffer[..written], out) };
    symbol_count(written)
}

/// Decode a NUL-terminated geohash to its cell center
///
/// # Safety
///
/// `hash` must be null or NUL-terminated; `out_lat`/`out_lng` must be null or writable
#[no_mangle]
pub unsafe extern "C" fn geohash_decode(
    hash: *const c_char,
    out_lat: *mut f64,
    out_lng: *mut f64,
) -> c_int {
    if out_lat.is_null() || out_lng.is_null() {
        return abi::ERROR;
    }
    // SAFETY: forwarded caller contract
    let Some(bytes) = (unsafe { c_bytes(hash) }) else {
        return abi::ERROR;
    };
    match geohash::decode(bytes) {
        Ok(center) => {
            // SAFETY: both pointers checked non-null and writable per contract
            unsafe {
                out_lat.write(center.lat());
                out_lng.write(center.lng());
            }
            abi::OK
        }
        Err(_) => abi::ERROR,
    }
}

/// Write the 8 neighbors (N, NE, E, SE, S, SW, W, NW) of `hash` into `out`
///
/// # Safety
///
/// `hash` must be null or NUL-terminated; `out` must be null or point to 8 writable buffers
#[no_mangle]
pub unsafe extern "C" fn geohash_neighbors(
    hash: *const c_char,
    out: *mut NeighborBuffer,
) -> c_int {
    if out.is_null() {
        return abi::ERROR;
    }
    // SAFETY: forwarded caller contract
    let Some(bytes) = (unsafe { c_bytes(hash) }) else {
        return abi::ERROR;
    };
    let mut buffers = [HashBuffer::default(); 8];
    let Ok(precision) = geohash::neighbors_into(bytes, &mut buffers) else {
        return abi::ERROR;
    };
    for (index, buffer) in buffers.iter().enumerate() {
        // SAFETY: `out` points to 8 buffers of 13 bytes
        unsafe { write_c_string(&buffer[..precision.len()], out.add(index).cast::<c_char>()) };
    }
    abi::OK
}

/// Half-errors in degrees of a cell at `precision` (1..=12, not clamped)
///
/// # Safety
///
/// `lat_err`/`lng_err` must be null or writable
#[no_mangle]
pub unsafe extern "C" fn geohash_precision_error(
    precision: c_int,
    lat_err: *mut f64,
    lng_err: *mut f64,
) -> c_int {
    let in_range = (1..=12).contains(&precision);
    if !in_range || lat_err.is_null() || lng_err.is_null() {
        return abi::ERROR;
    }
    let level = GeohashPrecision::clamped(i64::from(precision));
    // SAFETY: both pointers checked non-null and writable per contract
    unsafe {
        lat_err.write(level.lat_error());
        lng_err.write(level.lng_error());
    }
    abi::OK
}

fn coordinates(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Option<(Coordinate, Coordinate)> {
    Some((Coordinate::new(lat1, lng1).ok()?, Coordinate::new(lat2, lng2).ok()?))
}

/// Great-circle distance in meters, or -1.0 for invalid coordinates
#[no_mangle]
pub extern "C" fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    coordinates(lat1, lng1, lat2, lng2).map_or(-1.0, |(from, to)| {
        distance::haversine_meters(from, to)
    })
}

/// 1 when the second point is within `radius_meters` of the first, 0 if not, -1 on invalid input
#[no_mangle]
pub extern "C" fn is_within_radius(
    lat1: f64,
    lng1: f64,
    lat2: f64,
    lng2: f64,
    radius_meters: f64,
) -> c_int {
    let Some((center, point)) = coordinates(lat1, lng1, lat2, lng2) else {
        return abi::ERROR;
    };
    match distance::is_within_radius(center, point, radius_meters) {
        Ok(inside) => c_int::from(inside),
        Err(_) => abi::ERROR,
    }
}

/// Bounding box of a circle; latitude clamped, longitude not wrapped
///
/// # Safety
///
/// All four output pointers must be null or writable
#[no_mangle]
pub unsafe extern "C" fn bounding_box(
    lat: f64,
    lng: f64,
    radius_meters: f64,
    min_lat: *mut f64,
    max_lat: *mut f64,
    min_lng: *mut f64,
    max_lng: *mut f64,
) -> c_int {
    if min_lat.is_null() || max_lat.is_null() || min_lng.is_null() || max_lng.is_null() {
        return abi::ERROR;
    }
    let Ok(center) = Coordinate::new(lat, lng) else {
        return abi::ERROR;
    };
    let Ok(bbox) = distance::bounding_box(center, radius_meters) else {
        return abi::ERROR;
    };
    // SAFETY: all pointers checked non-null and writable per contract
    unsafe {
        min_lat.write(bbox.min_lat);
        max_lat.write(bbox.max_lat);
        min_lng.write(bbox.min_lng);
        max_lng.write(bbox.max_lng);
    }
    abi::OK
}

/// Recommended precision (1..=12) for a search radius
#[no_mangle]
pub extern "C" fn optimal_precision(radius_meters: f64) -> c_int {
    c_int::from(distance::optimal_precision(radius_meters).get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_encode_writes_nul_terminated() {
        let mut out: [c_char; C_BUFFER_LEN] = [0; C_BUFFER_LEN];
        let written = unsafe { geohash_encode(40.7128, -74.0060, 9, out.as_mut_ptr()) };
        assert_eq!(written, 9);
        let hash = unsafe { CStr::from_ptr(out.as_ptr()) };
        assert_eq!(hash.to_str().unwrap(), "dr5regw3p");
    }

    #[test]
    fn test_encode_rejects_invalid_coordinates() {
        let mut out: [c_char; C_BUFFER_LEN] = [0; C_BUFFER_LEN];
        assert_eq!(
            unsafe { geohash_encode(91.0, 0.0, 9, out.as_mut_ptr()) },
            abi::ERROR
        );
        assert_eq!(
            unsafe { geohash_encode(0.0, 0.0, 9, ptr::null_mut()) },
            abi::ERROR
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let (mut lat, mut lng) = (0.0, 0.0);
        let status = unsafe { geohash_decode(c"dr5regw3p".as_ptr(), &mut lat, &mut lng) };
        assert_eq!(status, abi::OK);
        assert!((lat - 40.7128).abs() < 0.001);
        assert!((lng + 74.0060).abs() < 0.001);
        assert_eq!(
            unsafe { geohash_decode(c"dr5o".as_ptr(), &mut lat, &mut lng) },
            abi::ERROR
        );
    }

    #[test]
    fn test_neighbors_fill_eight_buffers() {
        let mut out: [NeighborBuffer; 8] = [[0; C_BUFFER_LEN]; 8];
        let status = unsafe { geohash_neighbors(c"dr5ru".as_ptr(), out.as_mut_ptr()) };
        assert_eq!(status, abi::OK);
        for buffer in &out {
            let hash = unsafe { CStr::from_ptr(buffer.as_ptr()) };
            assert_eq!(hash.to_bytes().len(), 5);
        }
    }

    #[test]
    fn test_distance_exports_flag_invalid_input() {
        assert!((haversine_meters(91.0, 0.0, 0.0, 0.0) + 1.0).abs() < f64::EPSILON);
        assert_eq!(is_within_radius(0.0, 0.0, 0.0, 0.001, 1_000.0), 1);
        assert_eq!(is_within_radius(0.0, 0.0, 0.0, 0.001, -1.0), abi::ERROR);
        assert_eq!(optimal_precision(10.0), 9);
    }

    #[test]
    fn test_precision_error_rejects_out_of_range() {
        let (mut lat_err, mut lng_err) = (0.0, 0.0);
        assert_eq!(
            unsafe { geohash_precision_error(13, &mut lat_err, &mut lng_err) },
            abi::ERROR
        );
        assert_eq!(
            unsafe { geohash_precision_error(1, &mut lat_err, &mut lng_err) },
            abi::OK
        );
        assert!((lat_err - 22.5).abs() < f64::EPSILON);
    }
}
