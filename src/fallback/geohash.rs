// ABOUTME: Pure Rust geohash codec used when the native geo library is not bound
// ABOUTME: Builds the interleaved bit string in a u64 and slices it into base-32 symbols
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use musclemap_core::constants::{earth, geohash};
use musclemap_core::{AccelError, AccelResult, Coordinate, Direction, GeohashPrecision};

const SYMBOL_MASK: u64 = 0b1_1111;

fn symbol_value(character: char) -> Option<u64> {
    let lower = character.to_ascii_lowercase();
    geohash::BASE32
        .iter()
        .position(|&symbol| char::from(symbol) == lower)
        .map(|value| value as u64)
}

/// Interleaved bits of `coord`, longitude first, most significant bit first
fn interleave(coord: Coordinate, bits: u32) -> u64 {
    let (mut lat_lo, mut lat_hi) = (earth::MIN_LAT, earth::MAX_LAT);
    let (mut lng_lo, mut lng_hi) = (earth::MIN_LNG, earth::MAX_LNG);
    let mut acc = 0_u64;

    for bit in 0..bits {
        let upper = if bit % 2 == 0 {
            let mid = (lng_lo + lng_hi) / 2.0;
            let upper = coord.lng() >= mid;
            if upper {
                lng_lo = mid;
            } else {
                lng_hi = mid;
            }
            upper
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            let upper = coord.lat() >= mid;
            if upper {
                lat_lo = mid;
            } else {
                lat_hi = mid;
            }
            upper
        };
        acc = (acc << 1) | u64::from(upper);
    }
    acc
}

/// Encode a coordinate at the given precision
#[must_use]
pub fn encode(coord: Coordinate, precision: GeohashPrecision) -> String {
    let symbols = u32::from(precision.get());
    let bits = interleave(coord, symbols * geohash::BITS_PER_SYMBOL);
    (0..symbols)
        .rev()
        .map(|index| {
            let value = (bits >> (index * geohash::BITS_PER_SYMBOL)) & SYMBOL_MASK;
            char::from(geohash::BASE32[value as usize])
        })
        .collect()
}

/// Decode a geohash to its cell center
///
/// # Errors
///
/// Length and alphabet errors from [`GeohashPrecision::for_hash`]
pub fn decode(hash: &str) -> AccelResult<Coordinate> {
    GeohashPrecision::for_hash(hash)?;

    let (mut lat_lo, mut lat_hi) = (earth::MIN_LAT, earth::MAX_LAT);
    let (mut lng_lo, mut lng_hi) = (earth::MIN_LNG, earth::MAX_LNG);
    let mut even = true;

    for (position, character) in hash.chars().enumerate() {
        let value = symbol_value(character).ok_or(AccelError::InvalidGeohashCharacter {
            character,
            position,
        })?;
        for shift in (0..geohash::BITS_PER_SYMBOL).rev() {
            let upper = (value >> shift) & 1 == 1;
            let (lo, hi) = if even {
                (&mut lng_lo, &mut lng_hi)
            } else {
                (&mut lat_lo, &mut lat_hi)
            };
            let mid = (*lo + *hi) / 2.0;
            if upper {
                *lo = mid;
            } else {
                *hi = mid;
            }
            even = !even;
        }
    }

    Coordinate::new((lat_lo + lat_hi) / 2.0, (lng_lo + lng_hi) / 2.0)
}

/// The eight adjacent cells, ordered N, NE, E, SE, S, SW, W, NW
///
/// # Errors
///
/// Decode errors for malformed input
pub fn neighbors(hash: &str) -> AccelResult<[String; 8]> {
    let precision = GeohashPrecision::for_hash(hash)?;
    let center = decode(hash)?;
    let height = precision.lat_error() * 2.0;
    let width = precision.lng_error() * 2.0;

    let mut found: [String; 8] = Default::default();
    for (slot, direction) in found.iter_mut().zip(Direction::ALL) {
        let (dlat, dlng) = direction.offset();
        let lat = dlat
            .mul_add(height, center.lat())
            .clamp(earth::MIN_LAT, earth::MAX_LAT);
        let mut lng = dlng.mul_add(width, center.lng());
        if lng > earth::MAX_LNG {
            lng -= 360.0;
        } else if lng < earth::MIN_LNG {
            lng += 360.0;
        }
        *slot = encode(Coordinate::new(lat, lng)?, precision);
    }
    Ok(found)
}

/// Cell half-errors in degrees
#[must_use]
pub fn precision_error(precision: GeohashPrecision) -> (f64, f64) {
    (precision.lat_error(), precision.lng_error())
}
