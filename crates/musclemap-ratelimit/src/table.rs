// ABOUTME: Fixed-capacity linearly probed slot table implementing the sliding-window limiter
// ABOUTME: Per-identity admission under a shared structural lock, bulk clearing under the exclusive lock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::slot::{second_of, Slot};
use musclemap_core::constants::rate_limit::{
    DEFAULT_WINDOW_SECONDS, EMPTY_IDENTITY, MAX_PROBES, MAX_WINDOW_SECONDS,
};
use musclemap_core::hash::start_slot;
use musclemap_core::{AccelError, AccelResult, Decision, LimitStatus, LimiterStats};
use parking_lot::RwLock;
use std::time::Instant;

/// Concurrent sliding-window rate limiter over a fixed slot table
///
/// The window is `window_seconds` one-second buckets (60 unless configured).
///
/// Times passed to the `*_at` methods are milliseconds since the table was
/// created; the plain methods read the table clock.
pub struct SlotTable {
    slots: Box<[Slot]>,
    limit: u32,
    window_seconds: u32,
    structure: RwLock<()>,
    epoch: Instant,
}

impl SlotTable {
    /// Allocate a table with `capacity` slots admitting `limit` requests per 60-second window
    ///
    /// # Errors
    ///
    /// Returns `ZeroCapacity` when `capacity` is zero
    pub fn new(capacity: usize, limit: u32) -> AccelResult<Self> {
        Self::with_window(capacity, limit, DEFAULT_WINDOW_SECONDS)
    }

    /// Allocate a table whose window spans `window_seconds` one-second buckets
    ///
    /// # Errors
    ///
    /// Returns `ZeroCapacity` when `capacity` is zero and `InvalidWindow`
    /// unless `window_seconds` is within 1 to 3600
    pub fn with_window(capacity: usize, limit: u32, window_seconds: u32) -> AccelResult<Self> {
        if capacity == 0 {
            return Err(AccelError::ZeroCapacity);
        }
        if !(1..=MAX_WINDOW_SECONDS).contains(&window_seconds) {
            return Err(AccelError::InvalidWindow(window_seconds));
        }
        Ok(Self {
            slots: (0..capacity).map(|_| Slot::new(window_seconds)).collect(),
            limit,
            window_seconds,
            structure: RwLock::new(()),
            epoch: Instant::now(),
        })
    }

    /// Number of slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
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

    /// Milliseconds elapsed on the table clock
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn probe_bound(&self) -> usize {
        MAX_PROBES.min(self.slots.len())
    }

    fn probe_sequence(&self, identity: u64) -> impl Iterator<Item = &Slot> {
        let len = self.slots.len();
        let start = start_slot(identity, len);
        (0..self.probe_bound()).map(move |step| &self.slots[(start + step) % len])
    }

    /// Slot owned by `identity`, claiming an empty one on the way if needed
    ///
    /// Slots are only released under the exclusive lock, so while the shared
    /// lock is held an identity's slot always precedes any empty slot in its
    /// probe sequence.
    fn claim(&self, identity: u64) -> AccelResult<&Slot> {
        self.probe_sequence(identity)
            .find(|slot| slot.claim(identity))
            .ok_or(AccelError::CapacityExhausted {
                identity,
                probes: self.probe_bound(),
            })
    }

    fn find(&self, identity: u64) -> Option<&Slot> {
        for slot in self.probe_sequence(identity) {
            match slot.identity() {
                owner if owner == identity => return Some(slot),
                EMPTY_IDENTITY => return None,
                _ => {}
            }
        }
        None
    }

    fn validate_identity(identity: u64) -> AccelResult<()> {
        if identity == EMPTY_IDENTITY {
            Err(AccelError::ReservedIdentity)
        } else {
            Ok(())
        }
    }

    /// Admit `count` requests for `identity` if they fit in the current window
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentity`, `ZeroCount`, or `CapacityExhausted` when no
    /// slot could be claimed within the probe bound
    pub fn check(&self, identity: u64, count: u32) -> AccelResult<Decision> {
        self.check_at(identity, count, self.elapsed_ms())
    }

    /// [`Self::check`] at an explicit table time
    ///
    /// # Errors
    ///
    /// See [`Self::check`]
    pub fn check_at(&self, identity: u64, count: u32, now_ms: u64) -> AccelResult<Decision> {
        Self::validate_identity(identity)?;
        if count == 0 {
            return Err(AccelError::ZeroCount);
        }

        let _structure = self.structure.read();
        let slot = self.claim(identity)?;
        let _admission = slot.admission();

        let now = second_of(now_ms);
        if now_ms.saturating_sub(slot.last_ms()) > u64::from(self.window_seconds) * 1_000 {
            slot.expire_stale(now);
        }

        if slot.usage(now) + u64::from(count) > u64::from(self.limit) {
            return Ok(Decision::Denied);
        }
        slot.record(now, count);
        slot.touch(now_ms);
        Ok(Decision::Allowed)
    }

    /// Requests `identity` may still make in the current window
    ///
    /// Unseen identities get the full limit. Never claims a slot.
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentity` for identity 0
    pub fn remaining(&self, identity: u64) -> AccelResult<u32> {
        self.remaining_at(identity, self.elapsed_ms())
    }

    /// [`Self::remaining`] at an explicit table time
    ///
    /// # Errors
    ///
    /// See [`Self::remaining`]
    pub fn remaining_at(&self, identity: u64, now_ms: u64) -> AccelResult<u32> {
        Self::validate_identity(identity)?;
        let _structure = self.structure.read();
        let used = self
            .find(identity)
            .map_or(0, |slot| slot.usage(second_of(now_ms)));
        let left = u64::from(self.limit).saturating_sub(used);
        Ok(u32::try_from(left).unwrap_or(self.limit))
    }

    /// Window of `identity` without counting anything or claiming a slot
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentity` for identity 0
    pub fn peek(&self, identity: u64) -> AccelResult<LimitStatus> {
        self.peek_at(identity, self.elapsed_ms())
    }

    /// [`Self::peek`] at an explicit table time
    ///
    /// # Errors
    ///
    /// See [`Self::peek`]
    pub fn peek_at(&self, identity: u64, now_ms: u64) -> AccelResult<LimitStatus> {
        Self::validate_identity(identity)?;
        let _structure = self.structure.read();
        let (used, reset_after_ms) = self.find(identity).map_or((0, 0), |slot| {
            (slot.usage(second_of(now_ms)), slot.expires_in_ms(now_ms))
        });
        let remaining = u64::from(self.limit).saturating_sub(used);
        Ok(LimitStatus::from_remaining(
            self.limit,
            u32::try_from(remaining).unwrap_or(self.limit),
            reset_after_ms,
        ))
    }

    /// Milliseconds until the oldest request of `identity` leaves the window
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentity` for identity 0
    pub fn reset_after(&self, identity: u64) -> AccelResult<u64> {
        self.reset_after_at(identity, self.elapsed_ms())
    }

    /// [`Self::reset_after`] at an explicit table time
    ///
    /// # Errors
    ///
    /// See [`Self::reset_after`]
    pub fn reset_after_at(&self, identity: u64, now_ms: u64) -> AccelResult<u64> {
        Self::validate_identity(identity)?;
        let _structure = self.structure.read();
        Ok(self
            .find(identity)
            .map_or(0, |slot| slot.expires_in_ms(now_ms)))
    }

    /// Zero the counters of `identity`; a no-op for unseen identities
    ///
    /// The identity keeps its slot.
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentity` for identity 0
    pub fn reset_user(&self, identity: u64) -> AccelResult<()> {
        Self::validate_identity(identity)?;
        let _structure = self.structure.read();
        if let Some(slot) = self.find(identity) {
            let _admission = slot.admission();
            slot.reset_counters();
        }
        Ok(())
    }

    /// Zero every slot and release every identity claim
    pub fn clear_all(&self) {
        let _structure = self.structure.write();
        for slot in &*self.slots {
            slot.release();
        }
    }

    /// Claimed slots and live-window request totals
    #[must_use]
    pub fn stats(&self) -> LimiterStats {
        self.stats_at(self.elapsed_ms())
    }

    /// [`Self::stats`] at an explicit table time
    #[must_use]
    pub fn stats_at(&self, now_ms: u64) -> LimiterStats {
        let _structure = self.structure.read();
        let now = second_of(now_ms);
        self.slots
            .iter()
            .filter(|slot| slot.identity() != EMPTY_IDENTITY)
            .fold(LimiterStats::default(), |mut stats, slot| {
                stats.active_identities += 1;
                stats.total_requests += slot.usage(now);
                stats
            })
    }
}
