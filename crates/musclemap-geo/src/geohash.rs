// ABOUTME: Geohash bit-interleaving codec over fixed-size byte buffers
// ABOUTME: Encodes coordinates to base-32 symbols, decodes them, and finds neighbor cells
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Geohash codec
//!
//! Longitude and latitude intervals are bisected alternately, longitude
//! first. Each bisection emits one bit (1 = upper half); five bits form one
//! base-32 symbol. Encoding writes into caller-provided buffers so the C ABI
//! never allocates.

use musclemap_core::constants::{earth, geohash};
use musclemap_core::{AccelError, AccelResult, Coordinate, Direction, GeohashPrecision};

/// Longest hash the codec produces
pub const MAX_SYMBOLS: usize = geohash::MAX_PRECISION as usize;

/// Buffer holding one encoded hash (unused tail bytes are zero)
pub type HashBuffer = [u8; MAX_SYMBOLS];

/// ASCII byte to 5-bit symbol value; -1 outside the alphabet. Upper case accepted.
const DECODE: [i8; 128] = build_decode_table();

const fn build_decode_table() -> [i8; 128] {
    let mut table = [-1_i8; 128];
    let mut value = 0;
    while value < geohash::BASE32.len() {
        let symbol = geohash::BASE32[value];
        table[symbol as usize] = value as i8;
        table[symbol.to_ascii_uppercase() as usize] = value as i8;
        value += 1;
    }
    table
}

#[derive(Clone, Copy)]
struct Interval {
    low: f64,
    high: f64,
}

impl Interval {
    const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    fn mid(self) -> f64 {
        (self.low + self.high) * 0.5
    }

    fn narrow(&mut self, upper: bool) {
        let mid = self.mid();
        if upper {
            self.low = mid;
        } else {
            self.high = mid;
        }
    }
}

/// Encode a coordinate into `out`, returning the number of symbols written
pub fn encode_into(coord: Coordinate, precision: GeohashPrecision, out: &mut HashBuffer) -> usize {
    let mut lat = Interval::new(earth::MIN_LAT, earth::MAX_LAT);
    let mut lng = Interval::new(earth::MIN_LNG, earth::MAX_LNG);
    let mut on_lng = true;

    out.fill(0);
    for slot in out.iter_mut().take(precision.len()) {
        let mut symbol = 0_u8;
        for _ in 0..geohash::BITS_PER_SYMBOL {
            let (interval, value) = if on_lng {
                (&mut lng, coord.lng())
            } else {
                (&mut lat, coord.lat())
            };
            let upper = value >= interval.mid();
            interval.narrow(upper);
            symbol = (symbol << 1) | u8::from(upper);
            on_lng = !on_lng;
        }
        *slot = geohash::BASE32[usize::from(symbol)];
    }
    precision.len()
}

/// Encode a coordinate into an owned string
#[must_use]
pub fn encode(coord: Coordinate, precision: GeohashPrecision) -> String {
    let mut buffer = HashBuffer::default();
    let written = encode_into(coord, precision, &mut buffer);
    buffer[..written].iter().copied().map(char::from).collect()
}

/// Decode a geohash to the center of its cell
///
/// # Errors
///
/// Returns `InvalidGeohashLength` for empty or over-long input and
/// `InvalidGeohashCharacter` for bytes outside the alphabet
pub fn decode(hash: &[u8]) -> AccelResult<Coordinate> {
    if hash.is_empty() || hash.len() > MAX_SYMBOLS {
        return Err(AccelError::InvalidGeohashLength(hash.len()));
    }

    let mut lat = Interval::new(earth::MIN_LAT, earth::MAX_LAT);
    let mut lng = Interval::new(earth::MIN_LNG, earth::MAX_LNG);
    let mut on_lng = true;

    for (position, &byte) in hash.iter().enumerate() {
        let value = DECODE.get(usize::from(byte)).copied().unwrap_or(-1);
        if value < 0 {
            return Err(AccelError::InvalidGeohashCharacter {
                character: char::from(byte),
                position,
            });
        }
        for bit in (0..geohash::BITS_PER_SYMBOL).rev() {
            let upper = (value >> bit) & 1 == 1;
            if on_lng {
                lng.narrow(upper);
            } else {
                lat.narrow(upper);
            }
            on_lng = !on_lng;
        }
    }

    Coordinate::new(lat.mid(), lng.mid())
}

/// Bring a longitude that stepped past the antimeridian back into range
fn wrap_longitude(mut lng: f64) -> f64 {
    while lng > earth::MAX_LNG {
        lng -= 360.0;
    }
    while lng < earth::MIN_LNG {
        lng += 360.0;
    }
    lng
}

/// Write the eight neighbors of `hash` into `out`, ordered N, NE, E, SE, S, SW, W, NW
///
/// Each neighbor is found by stepping two half-errors (one full cell) from
/// the decoded center, so it lands on the center of the adjacent cell.
///
/// # Errors
///
/// Returns the decode error for malformed input
pub fn neighbors_into(hash: &[u8], out: &mut [HashBuffer; 8]) -> AccelResult<GeohashPrecision> {
    let center = decode(hash)?;
    // Safe: decode accepted 1..=12 symbols
    let precision = GeohashPrecision::clamped(hash.len() as i64);
    let lat_step = precision.lat_error() * 2.0;
    let lng_step = precision.lng_error() * 2.0;

    for (direction, buffer) in Direction::ALL.iter().zip(out.iter_mut()) {
        let (dlat, dlng) = direction.offset();
        let lat = dlat
            .mul_add(lat_step, center.lat())
            .clamp(earth::MIN_LAT, earth::MAX_LAT);
        let lng = wrap_longitude(dlng.mul_add(lng_step, center.lng()));
        encode_into(Coordinate::new(lat, lng)?, precision, buffer);
    }
    Ok(precision)
}

/// Eight neighbors of `hash` as owned strings
///
/// # Errors
///
/// Returns the decode error for malformed input
pub fn neighbors(hash: &str) -> AccelResult<[String; 8]> {
    let mut buffers = [HashBuffer::default(); 8];
    let precision = neighbors_into(hash.as_bytes(), &mut buffers)?;
    Ok(buffers.map(|buffer| {
        buffer[..precision.len()]
            .iter()
            .copied()
            .map(char::from)
            .collect()
    }))
}
