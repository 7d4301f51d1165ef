// ABOUTME: Avalanching 64-bit mixer used to spread identities over rate limiter slots
// ABOUTME: Shared by the native slot table and the fallback limiter so both probe identically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Mix an identity into a well-distributed 64-bit hash
///
/// `SplitMix64`/Murmur3 finalizer: sequential identities land far apart.
#[must_use]
pub const fn mix64(identity: u64) -> u64 {
    let mut h = identity;
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

/// First slot probed for `identity` in a table of `len` slots
///
/// `len` must be non-zero.
#[must_use]
pub const fn start_slot(identity: u64, len: usize) -> usize {
    // The remainder is below `len`, so it fits in usize
    (mix64(identity) % len as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_is_deterministic_and_spreads_neighbors() {
        assert_eq!(mix64(42), mix64(42));
        assert_ne!(mix64(1), mix64(2));
        assert_eq!(mix64(0), 0);
        // Consecutive identities should not map to consecutive slots
        let a = start_slot(1000, 1024);
        let b = start_slot(1001, 1024);
        assert_ne!(a + 1, b);
    }

    #[test]
    fn test_start_slot_is_in_range() {
        for identity in 1..500 {
            assert!(start_slot(identity, 9) < 9);
        }
        assert_eq!(start_slot(77, 1), 0);
    }
}
