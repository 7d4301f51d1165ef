// ABOUTME: Dispatched sliding-window rate limiter over a native table or the pure fallback
// ABOUTME: Separates quota denials from capacity exhaustion and applies one failure policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Rate limiter
//!
//! [`RateLimiter::check`] answers three different things: the request was
//! admitted, it was over quota, or no decision could be made (capacity
//! exhaustion). [`RateLimiter::admit`] folds the third case through the
//! configured [`FailurePolicy`].

use crate::config::FailurePolicy;
use crate::fallback::FallbackRateLimiter;
use crate::native::{NativeRateLimit, NativeTable};
use crate::registry::Backend;
use musclemap_core::constants::{abi, libraries, rate_limit};
use musclemap_core::{AccelError, AccelResult, Decision, LimitStatus, LimiterStats};
use std::time::Duration;
use tracing::{debug, warn};

enum Table {
    Native(NativeTable),
    Fallback(FallbackRateLimiter),
}

/// Sliding-window rate limiter with a fixed identity capacity
pub struct RateLimiter {
    table: Table,
    capacity: usize,
    limit: u32,
    window_seconds: u32,
    policy: FailurePolicy,
}

impl RateLimiter {
    /// Limiter on the pure fallback with a 60-second window and the default failure policy
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when `capacity` is zero
    pub fn fallback(capacity: usize, limit: u32) -> AccelResult<Self> {
        Self::fallback_with_window(capacity, limit, rate_limit::DEFAULT_WINDOW_SECONDS)
    }

    /// Limiter on the pure fallback with a window of `window_seconds`
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when `capacity` is zero, `InvalidWindow` unless
    /// `window_seconds` is within 1 to 3600
    pub fn fallback_with_window(
        capacity: usize,
        limit: u32,
        window_seconds: u32,
    ) -> AccelResult<Self> {
        Ok(Self {
            table: Table::Fallback(FallbackRateLimiter::with_window(
                capacity,
                limit,
                window_seconds,
            )?),
            capacity,
            limit,
            window_seconds,
            policy: FailurePolicy::default(),
        })
    }

    /// Limiter with a 60-second window on a native table, or on the fallback
    /// when none is bound or the library refuses to allocate one
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when `capacity` is zero
    pub fn new(
        binding: Option<&NativeRateLimit>,
        capacity: usize,
        limit: u32,
        policy: FailurePolicy,
    ) -> AccelResult<Self> {
        Self::with_window(
            binding,
            capacity,
            limit,
            rate_limit::DEFAULT_WINDOW_SECONDS,
            policy,
        )
    }

    /// [`Self::new`] with a window of `window_seconds` one-second buckets
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when `capacity` is zero, `InvalidWindow` unless
    /// `window_seconds` is within 1 to 3600
    pub fn with_window(
        binding: Option<&NativeRateLimit>,
        capacity: usize,
        limit: u32,
        window_seconds: u32,
        policy: FailurePolicy,
    ) -> AccelResult<Self> {
        if capacity == 0 {
            return Err(AccelError::ZeroCapacity);
        }
        if !(1..=rate_limit::MAX_WINDOW_SECONDS).contains(&window_seconds) {
            return Err(AccelError::InvalidWindow(window_seconds));
        }
        let fallback = || {
            Self::fallback_with_window(capacity, limit, window_seconds)
                .map(|limiter| limiter.with_policy(policy))
        };
        let Some(binding) = binding else {
            return fallback();
        };
        match binding.create(capacity, limit, window_seconds) {
            Some(table) => Ok(Self {
                table: Table::Native(table),
                capacity,
                limit,
                window_seconds,
                policy,
            }),
            None => {
                warn!(
                    backend = "native",
                    library = libraries::RATE_LIMIT,
                    capacity,
                    limit,
                    window_seconds,
                    "ratelimit_create returned null, using fallback limiter"
                );
                fallback()
            }
        }
    }

    /// Same limiter with another failure policy
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Backend holding the counters
    #[must_use]
    pub const fn backend(&self) -> Backend {
        match self.table {
            Table::Native(_) => Backend::Native,
            Table::Fallback(_) => Backend::Fallback,
        }
    }

    /// Failure policy applied by [`Self::admit`]
    #[must_use]
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Identity capacity
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
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

    fn validate(identity: u64) -> AccelResult<()> {
        if identity == rate_limit::EMPTY_IDENTITY {
            return Err(AccelError::ReservedIdentity);
        }
        Ok(())
    }

    fn exhausted(&self, identity: u64) -> AccelError {
        AccelError::CapacityExhausted {
            identity,
            probes: rate_limit::MAX_PROBES.min(self.capacity),
        }
    }

    /// Admit `count` requests for `identity` if they fit in its window
    ///
    /// A denial consumes nothing.
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` and `ZeroCount` for invalid input;
    /// `CapacityExhausted` when the table has no room for a new identity
    pub fn check(&self, identity: u64, count: u32) -> AccelResult<Decision> {
        Self::validate(identity)?;
        if count == 0 {
            return Err(AccelError::ZeroCount);
        }

        let outcome = match &self.table {
            Table::Native(table) => match table.check(identity, count) {
                abi::ALLOWED => Ok(Decision::Allowed),
                abi::DENIED => Ok(Decision::Denied),
                abi::ERROR => Err(self.exhausted(identity)),
                code => {
                    warn!(
                        backend = "native",
                        identity,
                        code,
                        policy = %self.policy,
                        "Unexpected ratelimit_check code, applying failure policy"
                    );
                    Ok(self.policy.decision())
                }
            },
            Table::Fallback(table) => table.check(identity, count),
        };

        match &outcome {
            Ok(Decision::Denied) => debug!(identity, count, outcome = "denied", "Rate limited"),
            Err(e) if e.is_capacity_exhausted() => warn!(
                identity,
                capacity = self.capacity,
                outcome = "capacity_exhausted",
                "Rate limiter has no slot for identity"
            ),
            _ => {}
        }
        outcome
    }

    /// [`Self::check`] reduced to a yes/no answer
    ///
    /// Capacity exhaustion is answered by the failure policy; invalid input is
    /// always refused.
    #[must_use]
    pub fn admit(&self, identity: u64, count: u32) -> bool {
        match self.check(identity, count) {
            Ok(decision) => decision.is_allowed(),
            Err(e) if e.is_capacity_exhausted() => self.policy.decision().is_allowed(),
            Err(_) => false,
        }
    }

    /// Requests `identity` may still make in the current window
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` for identity 0
    pub fn remaining(&self, identity: u64) -> AccelResult<u32> {
        Self::validate(identity)?;
        match &self.table {
            Table::Native(table) => {
                let left = table.remaining(identity);
                Ok(u32::try_from(left).unwrap_or_else(|_| {
                    warn!(
                        backend = "native",
                        identity,
                        code = left,
                        "Unexpected ratelimit_remaining result"
                    );
                    match self.policy {
                        FailurePolicy::Closed => 0,
                        FailurePolicy::Open => self.limit,
                    }
                }))
            }
            Table::Fallback(table) => table.remaining(identity),
        }
    }

    /// Window of `identity` without counting a request or claiming a slot
    ///
    /// `allowed` reports whether one more request would currently fit.
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` for identity 0
    pub fn peek(&self, identity: u64) -> AccelResult<LimitStatus> {
        Self::validate(identity)?;
        match &self.table {
            Table::Native(table) => Ok(table.peek(identity, self.limit).unwrap_or_else(|| {
                warn!(backend = "native", identity, "ratelimit_peek failed");
                let remaining = match self.policy {
                    FailurePolicy::Closed => 0,
                    FailurePolicy::Open => self.limit,
                };
                LimitStatus::from_remaining(self.limit, remaining, 0)
            })),
            Table::Fallback(table) => table.peek(identity),
        }
    }

    /// Time until the oldest counted request of `identity` leaves the window
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` for identity 0
    pub fn reset_after(&self, identity: u64) -> AccelResult<Duration> {
        Self::validate(identity)?;
        let millis = match &self.table {
            Table::Native(table) => table.reset_ms(identity),
            Table::Fallback(table) => table.reset_after(identity)?,
        };
        Ok(Duration::from_millis(millis))
    }

    /// Forget the counted requests of `identity`; a no-op for unseen identities
    ///
    /// # Errors
    ///
    /// `ReservedIdentity` for identity 0
    pub fn reset_user(&self, identity: u64) -> AccelResult<()> {
        Self::validate(identity)?;
        match &self.table {
            Table::Native(table) => {
                let code = table.reset_user(identity);
                if code != abi::OK {
                    warn!(backend = "native", identity, code, "ratelimit_reset_user failed");
                }
                Ok(())
            }
            Table::Fallback(table) => table.reset_user(identity),
        }
    }

    /// Forget every identity and its counters
    pub fn clear_all(&self) {
        match &self.table {
            Table::Native(table) => {
                let code = table.clear_all();
                if code != abi::OK {
                    warn!(backend = "native", code, "ratelimit_clear_all failed");
                }
            }
            Table::Fallback(table) => table.clear_all(),
        }
    }

    /// Tracked identities and requests counted in the live window
    #[must_use]
    pub fn stats(&self) -> LimiterStats {
        match &self.table {
            Table::Native(table) => table.stats().unwrap_or_else(|| {
                warn!(backend = "native", "ratelimit_stats failed");
                LimiterStats::default()
            }),
            Table::Fallback(table) => table.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_admission() {
        let limiter = RateLimiter::fallback(16, 3).unwrap();
        assert_eq!(limiter.backend(), Backend::Fallback);
        assert!(limiter.admit(1, 2));
        assert!(!limiter.admit(1, 2));
        assert_eq!(limiter.remaining(1), Ok(1));
    }

    #[test]
    fn test_policy_applies_to_capacity_only() {
        let open = RateLimiter::fallback(1, 3)
            .unwrap()
            .with_policy(FailurePolicy::Open);
        assert!(open.admit(1, 1));
        assert!(open.admit(2, 1));
        assert!(!open.admit(0, 1));
        assert!(!open.admit(1, 0));

        let closed = RateLimiter::fallback(1, 3).unwrap();
        assert!(closed.admit(1, 1));
        assert!(!closed.admit(2, 1));
    }

    #[test]
    fn test_window_is_validated() {
        assert_eq!(
            RateLimiter::with_window(None, 4, 2, 0, FailurePolicy::Closed).err(),
            Some(AccelError::InvalidWindow(0))
        );
        let limiter = RateLimiter::with_window(None, 4, 2, 3_600, FailurePolicy::Closed).unwrap();
        assert_eq!(limiter.window_seconds(), 3_600);
        assert_eq!(RateLimiter::fallback(4, 2).unwrap().window_seconds(), 60);
    }

    #[test]
    fn test_no_binding_means_fallback() {
        let limiter = RateLimiter::new(None, 4, 2, FailurePolicy::Open).unwrap();
        assert_eq!(limiter.backend(), Backend::Fallback);
        assert_eq!(limiter.policy(), FailurePolicy::Open);
        assert!(RateLimiter::new(None, 0, 2, FailurePolicy::Closed).is_err());
    }
}
