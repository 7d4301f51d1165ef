// ABOUTME: Safe wrapper over the native rate limiter exports and its opaque table handle
// ABOUTME: NativeTable owns one handle and destroys it on drop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::loader::symbol;
use super::ProbeFailure;
use libloading::Library;
use musclemap_core::constants::{abi, libraries, rate_limit};
use musclemap_core::{LimitStatus, LimiterStats};
use std::ffi::{c_int, c_void};
use std::ptr::NonNull;
use std::sync::Arc;

/// Function pointers of the rate limiter library exports
#[derive(Clone, Copy)]
pub struct RateLimitSymbols {
    /// `void *ratelimit_create(size_t capacity, uint32_t limit)`
    pub create: unsafe extern "C" fn(usize, u32) -> *mut c_void,
    /// `void *ratelimit_create_windowed(size_t capacity, uint32_t limit, uint32_t window_seconds)`
    pub create_windowed: unsafe extern "C" fn(usize, u32, u32) -> *mut c_void,
    /// `void ratelimit_destroy(void *handle)`
    pub destroy: unsafe extern "C" fn(*mut c_void),
    /// `int ratelimit_check(void *handle, uint64_t identity, uint32_t count)`
    pub check: unsafe extern "C" fn(*mut c_void, u64, u32) -> c_int,
    /// `int64_t ratelimit_remaining(void *handle, uint64_t identity)`
    pub remaining: unsafe extern "C" fn(*mut c_void, u64) -> i64,
    /// `int ratelimit_peek(void *handle, uint64_t identity, uint32_t *remaining, uint64_t *reset_ms)`
    pub peek: unsafe extern "C" fn(*mut c_void, u64, *mut u32, *mut u64) -> c_int,
    /// `uint64_t ratelimit_reset_ms(void *handle, uint64_t identity)`
    pub reset_ms: unsafe extern "C" fn(*mut c_void, u64) -> u64,
    /// `int ratelimit_reset_user(void *handle, uint64_t identity)`
    pub reset_user: unsafe extern "C" fn(*mut c_void, u64) -> c_int,
    /// `int ratelimit_clear_all(void *handle)`
    pub clear_all: unsafe extern "C" fn(*mut c_void) -> c_int,
    /// `int ratelimit_stats(void *handle, size_t *active, uint64_t *total)`
    pub stats: unsafe extern "C" fn(*mut c_void, *mut usize, *mut u64) -> c_int,
}

impl RateLimitSymbols {
    /// Resolve every export from a loaded library
    ///
    /// # Errors
    ///
    /// `MissingSymbol` naming the first absent export
    pub fn resolve(library: &Library) -> Result<Self, ProbeFailure> {
        let stem = libraries::RATE_LIMIT;
        // SAFETY: each type matches the corresponding export of musclemap-ratelimit
        unsafe {
            Ok(Self {
                create: symbol(library, stem, "ratelimit_create")?,
                create_windowed: symbol(library, stem, "ratelimit_create_windowed")?,
                destroy: symbol(library, stem, "ratelimit_destroy")?,
                check: symbol(library, stem, "ratelimit_check")?,
                remaining: symbol(library, stem, "ratelimit_remaining")?,
                peek: symbol(library, stem, "ratelimit_peek")?,
                reset_ms: symbol(library, stem, "ratelimit_reset_ms")?,
                reset_user: symbol(library, stem, "ratelimit_reset_user")?,
                clear_all: symbol(library, stem, "ratelimit_clear_all")?,
                stats: symbol(library, stem, "ratelimit_stats")?,
            })
        }
    }
}

/// Bound native rate limiter library; a factory for [`NativeTable`]s
#[derive(Clone)]
pub struct NativeRateLimit {
    symbols: RateLimitSymbols,
    library: Option<Arc<Library>>,
}

impl NativeRateLimit {
    /// Bind a loaded library
    ///
    /// # Errors
    ///
    /// `MissingSymbol` when an export is absent
    pub fn bind(library: Arc<Library>) -> Result<Self, ProbeFailure> {
        Ok(Self {
            symbols: RateLimitSymbols::resolve(&library)?,
            library: Some(library),
        })
    }

    /// Bind function pointers that are already in the process
    ///
    /// # Safety
    ///
    /// Every pointer must implement the documented C contract of its export
    #[must_use]
    pub unsafe fn from_symbols(symbols: RateLimitSymbols) -> Self {
        Self {
            symbols,
            library: None,
        }
    }

    /// Allocate a native table; `None` when the library returns a null handle
    ///
    /// The default 60-second window goes through `ratelimit_create`, any other
    /// length through `ratelimit_create_windowed`.
    #[must_use]
    pub fn create(&self, capacity: usize, limit: u32, window_seconds: u32) -> Option<NativeTable> {
        // SAFETY: plain value arguments
        let handle = unsafe {
            if window_seconds == rate_limit::DEFAULT_WINDOW_SECONDS {
                (self.symbols.create)(capacity, limit)
            } else {
                (self.symbols.create_windowed)(capacity, limit, window_seconds)
            }
        };
        NonNull::new(handle).map(|handle| NativeTable {
            handle,
            symbols: self.symbols,
            _library: self.library.clone(),
        })
    }
}

/// One native slot table, destroyed when dropped
///
/// Methods return the raw ABI codes; interpretation belongs to the caller.
pub struct NativeTable {
    handle: NonNull<c_void>,
    symbols: RateLimitSymbols,
    // Declared after `handle` so the library outlives the destroy call in Drop
    _library: Option<Arc<Library>>,
}

// SAFETY: the native table synchronizes internally and its handle may be used
// from any thread; the handle is only released in Drop, with exclusive access
unsafe impl Send for NativeTable {}
// SAFETY: see above; every export takes the handle by shared reference semantics
unsafe impl Sync for NativeTable {}

impl NativeTable {
    /// `ratelimit_check`
    #[must_use]
    pub fn check(&self, identity: u64, count: u32) -> c_int {
        // SAFETY: the handle is live until Drop
        unsafe { (self.symbols.check)(self.handle.as_ptr(), identity, count) }
    }

    /// `ratelimit_remaining`
    #[must_use]
    pub fn remaining(&self, identity: u64) -> i64 {
        // SAFETY: the handle is live until Drop
        unsafe { (self.symbols.remaining)(self.handle.as_ptr(), identity) }
    }

    /// `ratelimit_peek`; `None` on invalid arguments
    #[must_use]
    pub fn peek(&self, identity: u64, limit: u32) -> Option<LimitStatus> {
        let (mut remaining, mut reset_ms) = (0_u32, 0_u64);
        // SAFETY: the handle is live until Drop; outputs are valid stack slots
        let code = unsafe {
            (self.symbols.peek)(self.handle.as_ptr(), identity, &mut remaining, &mut reset_ms)
        };
        matches!(code, abi::ALLOWED | abi::DENIED)
            .then(|| LimitStatus::from_remaining(limit, remaining, reset_ms))
    }

    /// `ratelimit_reset_ms`
    #[must_use]
    pub fn reset_ms(&self, identity: u64) -> u64 {
        // SAFETY: the handle is live until Drop
        unsafe { (self.symbols.reset_ms)(self.handle.as_ptr(), identity) }
    }

    /// `ratelimit_reset_user`
    #[must_use]
    pub fn reset_user(&self, identity: u64) -> c_int {
        // SAFETY: the handle is live until Drop
        unsafe { (self.symbols.reset_user)(self.handle.as_ptr(), identity) }
    }

    /// `ratelimit_clear_all`
    #[must_use]
    pub fn clear_all(&self) -> c_int {
        // SAFETY: the handle is live until Drop
        unsafe { (self.symbols.clear_all)(self.handle.as_ptr()) }
    }

    /// `ratelimit_stats`; `None` on a non-success code
    #[must_use]
    pub fn stats(&self) -> Option<LimiterStats> {
        let (mut active, mut total) = (0_usize, 0_u64);
        // SAFETY: the handle is live until Drop; outputs are valid stack slots
        let status =
            unsafe { (self.symbols.stats)(self.handle.as_ptr(), &mut active, &mut total) };
        (status == abi::OK).then(|| LimiterStats {
            active_identities: active,
            total_requests: total,
        })
    }
}

impl Drop for NativeTable {
    fn drop(&mut self) {
        // SAFETY: the handle came from `ratelimit_create` and is released exactly once
        unsafe { (self.symbols.destroy)(self.handle.as_ptr()) };
    }
}
