// ABOUTME: Per-identity slot of the rate limiter table
// ABOUTME: Atomic identity claim, stamped per-second buckets, and a per-slot admission guard
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use musclemap_core::constants::rate_limit::EMPTY_IDENTITY;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

const COUNT_MASK: u64 = 0xFFFF_FFFF;

// Bucket word: high 32 bits = table second the bucket was written in, low 32 bits = count.
// Table seconds start at 1 so a zero word always means "never written".
const fn pack(second: u32, count: u32) -> u64 {
    ((second as u64) << 32) | count as u64
}

const fn stamp_of(word: u64) -> u32 {
    (word >> 32) as u32
}

const fn count_of(word: u64) -> u32 {
    (word & COUNT_MASK) as u32
}

/// Table second (1-based) containing `now_ms`
pub(crate) fn second_of(now_ms: u64) -> u32 {
    u32::try_from(now_ms / 1_000 + 1).unwrap_or(u32::MAX)
}

const fn is_live(word: u64, now: u32, window: u32) -> bool {
    let stamp = stamp_of(word);
    stamp != 0 && stamp <= now && now - stamp < window
}

pub(crate) struct Slot {
    identity: AtomicU64,
    admission: Mutex<()>,
    /// One bucket per second of the window
    buckets: Box<[AtomicU64]>,
    last_ms: AtomicU64,
}

impl Slot {
    /// Empty slot with a window of `window` seconds; `window` is at least 1
    pub(crate) fn new(window: u32) -> Self {
        Self {
            identity: AtomicU64::new(EMPTY_IDENTITY),
            admission: Mutex::new(()),
            buckets: (0..window).map(|_| AtomicU64::new(0)).collect(),
            last_ms: AtomicU64::new(0),
        }
    }

    fn window(&self) -> u32 {
        u32::try_from(self.buckets.len()).unwrap_or(u32::MAX)
    }

    pub(crate) fn identity(&self) -> u64 {
        self.identity.load(Ordering::Acquire)
    }

    /// Claim the slot for `identity` if it is empty.
    ///
    /// Returns whether the slot now belongs to `identity`, whether this call
    /// claimed it or an earlier one did.
    pub(crate) fn claim(&self, identity: u64) -> bool {
        match self.identity.compare_exchange(
            EMPTY_IDENTITY,
            identity,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(owner) => owner == identity,
        }
    }

    /// Serializes read-then-add admission for this identity
    pub(crate) fn admission(&self) -> MutexGuard<'_, ()> {
        self.admission.lock()
    }

    pub(crate) fn last_ms(&self) -> u64 {
        self.last_ms.load(Ordering::Acquire)
    }

    pub(crate) fn touch(&self, now_ms: u64) {
        self.last_ms.store(now_ms, Ordering::Release);
    }

    /// Requests recorded in the window ending at `now`
    pub(crate) fn usage(&self, now: u32) -> u64 {
        let window = self.window();
        self.buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Acquire))
            .filter(|&word| is_live(word, now, window))
            .map(|word| u64::from(count_of(word)))
            .sum()
    }

    /// Zero buckets that fell out of the window
    ///
    /// A bucket rewritten concurrently fails the exchange and is kept.
    pub(crate) fn expire_stale(&self, now: u32) {
        let window = self.window();
        for bucket in &*self.buckets {
            let word = bucket.load(Ordering::Acquire);
            if word != 0 && !is_live(word, now, window) {
                let _ = bucket.compare_exchange(word, 0, Ordering::AcqRel, Ordering::Acquire);
            }
        }
    }

    /// Add `count` to the bucket of second `now`, restarting it if it holds an older second
    pub(crate) fn record(&self, now: u32, count: u32) {
        let bucket = &self.buckets[now as usize % self.buckets.len()];
        let _ = bucket.fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
            if stamp_of(word) == now {
                Some(pack(now, count_of(word).saturating_add(count)))
            } else {
                Some(pack(now, count))
            }
        });
    }

    /// Milliseconds until the oldest live bucket leaves the window; 0 if none
    pub(crate) fn expires_in_ms(&self, now_ms: u64) -> u64 {
        let now = second_of(now_ms);
        let window = self.window();
        self.buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Acquire))
            .filter(|&word| is_live(word, now, window))
            .map(stamp_of)
            .min()
            .map_or(0, |oldest| {
                // Second `s` stops counting once the table clock reaches (s + window - 1) seconds
                let expires_at = (u64::from(oldest) + u64::from(window) - 1) * 1_000;
                expires_at.saturating_sub(now_ms)
            })
    }

    pub(crate) fn reset_counters(&self) {
        for bucket in &*self.buckets {
            bucket.store(0, Ordering::Release);
        }
        self.last_ms.store(0, Ordering::Release);
    }

    /// Zero everything and give the slot back; callers hold the table write lock
    pub(crate) fn release(&self) {
        self.reset_counters();
        self.identity.store(EMPTY_IDENTITY, Ordering::Release);
    }
}
