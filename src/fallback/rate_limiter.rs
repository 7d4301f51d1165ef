// ABOUTME: Pure Rust sliding-window rate limiter backed by a sharded concurrent map
// ABOUTME: Claims identities in a fixed probed slot array exactly like the native table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use dashmap::DashMap;
use musclemap_core::constants::rate_limit::{
    DEFAULT_WINDOW_SECONDS, EMPTY_IDENTITY, MAX_PROBES, MAX_WINDOW_SECONDS,
};
use musclemap_core::hash::start_slot;
use musclemap_core::{AccelError, AccelResult, Decision, LimitStatus, LimiterStats};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Per-identity ring of one-second counters
struct Window {
    counts: Box<[u32]>,
    /// Second the ring was last advanced to
    head: u64,
}

impl Window {
    fn new(now_sec: u64, window_seconds: u32) -> Self {
        Self {
            counts: vec![0; window_seconds as usize].into_boxed_slice(),
            head: now_sec,
        }
    }

    fn len(&self) -> u64 {
        self.counts.len() as u64
    }

    fn index(&self, second: u64) -> usize {
        // The remainder is below the ring length, so it fits in usize
        (second % self.len()) as usize
    }

    /// Clear every bucket whose second has left the window ending at `now_sec`
    fn advance(&mut self, now_sec: u64) {
        if now_sec <= self.head {
            return;
        }
        if now_sec - self.head >= self.len() {
            self.counts.fill(0);
        } else {
            for second in self.head + 1..=now_sec {
                let index = self.index(second);
                self.counts[index] = 0;
            }
        }
        self.head = now_sec;
    }

    fn total(&self) -> u64 {
        self.counts.iter().map(|&count| u64::from(count)).sum()
    }

    /// Oldest second still holding requests
    fn oldest(&self) -> Option<u64> {
        let first = self.head.saturating_sub(self.len() - 1);
        (first..=self.head).find(|&second| self.counts[self.index(second)] > 0)
    }

    /// Milliseconds until the oldest counted request leaves the window
    fn expires_in_ms(&self, now_ms: u64) -> u64 {
        self.oldest().map_or(0, |second| {
            ((second + self.len()) * 1_000).saturating_sub(now_ms)
        })
    }
}

/// Sliding-window limiter over a `DashMap` of per-identity windows
///
/// Identities are placed in a fixed array of `capacity` claims with the same
/// start slot and bounded linear probe as the native slot table, so a new
/// identity is refused with `CapacityExhausted` in exactly the cases the
/// native table refuses it. Claims are only released by `clear_all`.
pub struct FallbackRateLimiter {
    claims: Box<[AtomicU64]>,
    windows: DashMap<u64, Window>,
    limit: u32,
    window_seconds: u32,
    structure: RwLock<()>,
    epoch: Instant,
}

impl FallbackRateLimiter {
    /// Create a limiter with `capacity` identity slots and a 60-second window
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when `capacity` is zero
    pub fn new(capacity: usize, limit: u32) -> AccelResult<Self> {
        Self::with_window(capacity, limit, DEFAULT_WINDOW_SECONDS)
    }

    /// Create a limiter whose window spans `window_seconds` one-second buckets
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when `capacity` is zero, `InvalidWindow` unless
    /// `window_seconds` is within 1 to 3600
    pub fn with_window(capacity: usize, limit: u32, window_seconds: u32) -> AccelResult<Self> {
        if capacity == 0 {
            return Err(AccelError::ZeroCapacity);
        }
        if !(1..=MAX_WINDOW_SECONDS).contains(&window_seconds) {
            return Err(AccelError::InvalidWindow(window_seconds));
        }
        Ok(Self {
            claims: (0..capacity)
                .map(|_| AtomicU64::new(EMPTY_IDENTITY))
                .collect(),
            windows: DashMap::new(),
            limit,
            window_seconds,
            structure: RwLock::new(()),
            epoch: Instant::now(),
        })
    }

    /// Identity slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.claims.len()
    }

    /// Requests admitted per identity per window
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length in seconds
    #[must_use]
    pub const fn window_seconds(&self) -> u32 {
        self.window_seconds
    }

    /// Milliseconds since the limiter was created
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn probe_bound(&self) -> usize {
        MAX_PROBES.min(self.claims.len())
    }

    fn probe_sequence(&self, identity: u64) -> impl Iterator<Item = &AtomicU64> {
        let len = self.claims.len();
        let start = start_slot(identity, len);
        (0..self.probe_bound()).map(move |step| &self.claims[(start + step) % len])
    }

    /// Claim a slot for `identity`, or find the one it already holds
    fn claim(&self, identity: u64) -> AccelResult<()> {
        self.probe_sequence(identity)
            .any(|claim| {
                match claim.compare_exchange(
                    EMPTY_IDENTITY,
                    identity,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => true,
                    Err(owner) => owner == identity,
                }
            })
            .then_some(())
            .ok_or(AccelError::CapacityExhausted {
                identity,
                probes: self.probe_bound(),
            })
    }

    fn reject_reserved(identity: u64) -> AccelResult<()> {
        if identity == EMPTY_IDENTITY {
            return Err(AccelError::ReservedIdentity);
        }
        Ok(())
    }

    /// See `SlotTable::check`
    ///
    /// # Errors
    ///
    /// `ReservedIdentity`, `ZeroCount`, or `CapacityExhausted` when a new
    /// identity finds no free slot within the probe bound
    pub fn check(&self, identity: u64, count: u32) -> AccelResult<Decision> {
        self.check_at(identity, count, self.elapsed_ms())
    }

    /// [`Self::check`] at an explicit limiter time
    ///
    /// # Errors
    ///
    /// See [`Self::check`]
    pub fn check_at(&self, identity: u64, count: u32, now_ms: u64) -> AccelResult<Decision> {
        Self::reject_reserved(identity)?;
        if count == 0 {
            return Err(AccelError::ZeroCount);
        }
        let now_sec = now_ms / 1_000;

        let _structure = self.structure.read();
        self.claim(identity)?;
        let mut window = self
            .windows
            .entry(identity)
            .or_insert_with(|| Window::new(now_sec, self.window_seconds));
        window.advance(now_sec);

        if window.total() + u64::from(count) > u64::from(self.limit) {
            return Ok(Decision::Denied);
        }
        let index = window.index(now_sec);
        let bucket = &mut window.counts[index];
        *bucket = bucket.saturating_add(count);
        Ok(Decision::Allowed)
    }

    fn used_at(&self, identity: u64, now_ms: u64) -> u64 {
        self.windows.get_mut(&identity).map_or(0, |mut window| {
            window.advance(now_ms / 1_000);
            window.total()
        })
    }

    fn left(&self, used: u64) -> u32 {
        u32::try_from(u64::from(self.limit).saturating_sub(used)).unwrap_or(self.limit)
    }

    /// See `SlotTable::remaining`
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` for identity 0
    pub fn remaining(&self, identity: u64) -> AccelResult<u32> {
        self.remaining_at(identity, self.elapsed_ms())
    }

    /// [`Self::remaining`] at an explicit limiter time
    ///
    /// # Errors
    ///
    /// See [`Self::remaining`]
    pub fn remaining_at(&self, identity: u64, now_ms: u64) -> AccelResult<u32> {
        Self::reject_reserved(identity)?;
        let _structure = self.structure.read();
        Ok(self.left(self.used_at(identity, now_ms)))
    }

    /// See `SlotTable::peek`
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` for identity 0
    pub fn peek(&self, identity: u64) -> AccelResult<LimitStatus> {
        self.peek_at(identity, self.elapsed_ms())
    }

    /// [`Self::peek`] at an explicit limiter time
    ///
    /// # Errors
    ///
    /// See [`Self::peek`]
    pub fn peek_at(&self, identity: u64, now_ms: u64) -> AccelResult<LimitStatus> {
        Self::reject_reserved(identity)?;
        let _structure = self.structure.read();
        let (used, reset_after_ms) = self.windows.get_mut(&identity).map_or((0, 0), |mut window| {
            window.advance(now_ms / 1_000);
            (window.total(), window.expires_in_ms(now_ms))
        });
        Ok(LimitStatus::from_remaining(
            self.limit,
            self.left(used),
            reset_after_ms,
        ))
    }

    /// Milliseconds until the oldest counted request leaves the window
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` for identity 0
    pub fn reset_after(&self, identity: u64) -> AccelResult<u64> {
        self.reset_after_at(identity, self.elapsed_ms())
    }

    /// [`Self::reset_after`] at an explicit limiter time
    ///
    /// # Errors
    ///
    /// See [`Self::reset_after`]
    pub fn reset_after_at(&self, identity: u64, now_ms: u64) -> AccelResult<u64> {
        Self::reject_reserved(identity)?;
        let _structure = self.structure.read();
        Ok(self.windows.get_mut(&identity).map_or(0, |mut window| {
            window.advance(now_ms / 1_000);
            window.expires_in_ms(now_ms)
        }))
    }

    /// Forget the counted requests of `identity`; it keeps its slot
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` for identity 0
    pub fn reset_user(&self, identity: u64) -> AccelResult<()> {
        Self::reject_reserved(identity)?;
        let _structure = self.structure.read();
        if let Some(mut window) = self.windows.get_mut(&identity) {
            window.counts.fill(0);
        }
        Ok(())
    }

    /// Drop every window and release every slot
    pub fn clear_all(&self) {
        let _structure = self.structure.write();
        for claim in &*self.claims {
            claim.store(EMPTY_IDENTITY, Ordering::Release);
        }
        self.windows.clear();
    }

    /// Claimed slots and requests counted in the live window
    #[must_use]
    pub fn stats(&self) -> LimiterStats {
        self.stats_at(self.elapsed_ms())
    }

    /// [`Self::stats`] at an explicit limiter time
    #[must_use]
    pub fn stats_at(&self, now_ms: u64) -> LimiterStats {
        let _structure = self.structure.read();
        let active_identities = self
            .claims
            .iter()
            .filter(|claim| claim.load(Ordering::Acquire) != EMPTY_IDENTITY)
            .count();
        let total_requests = self
            .windows
            .iter_mut()
            .map(|mut window| {
                window.advance(now_ms / 1_000);
                window.total()
            })
            .sum();
        LimiterStats {
            active_identities,
            total_requests,
        }
    }
}
