// ABOUTME: C ABI exports of the slot table behind an opaque handle
// ABOUTME: Maps decisions and errors onto the shared integer return codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! C ABI exports
//!
//! A handle is created by [`ratelimit_create`] and must be released exactly
//! once with [`ratelimit_destroy`]. Handles are shareable across threads.

#![allow(unsafe_code)]

use crate::table::SlotTable;
use musclemap_core::constants::abi;
use musclemap_core::{AccelError, Decision};
use std::ffi::{c_int, c_void};
use std::ptr;

/// Borrow the table behind a handle
///
/// # Safety
///
/// `handle` must be null or a live handle from `ratelimit_create`
unsafe fn table<'a>(handle: *mut c_void) -> Option<&'a SlotTable> {
    // SAFETY: live handles point to a boxed SlotTable per the caller contract
    unsafe { handle.cast::<SlotTable>().as_ref() }
}

const fn error_code(error: &AccelError) -> c_int {
    if error.is_capacity_exhausted() {
        abi::ERROR
    } else {
        abi::INVALID_ARGUMENT
    }
}

fn into_handle(table: SlotTable) -> *mut c_void {
    Box::into_raw(Box::new(table)).cast::<c_void>()
}

/// Allocate a table with a 60-second window; null when `capacity` is zero
#[no_mangle]
pub extern "C" fn ratelimit_create(capacity: usize, limit: u32) -> *mut c_void {
    SlotTable::new(capacity, limit).map_or(ptr::null_mut(), into_handle)
}

/// Allocate a table with a window of `window_seconds` (1 to 3600); null on invalid arguments
#[no_mangle]
pub extern "C" fn ratelimit_create_windowed(
    capacity: usize,
    limit: u32,
    window_seconds: u32,
) -> *mut c_void {
    SlotTable::with_window(capacity, limit, window_seconds).map_or(ptr::null_mut(), into_handle)
}

/// Release a table; null is ignored
///
/// # Safety
///
/// `handle` must be null or a live handle, and must not be used afterwards
#[no_mangle]
pub unsafe extern "C" fn ratelimit_destroy(handle: *mut c_void) {
    if !handle.is_null() {
        // SAFETY: handle came from Box::into_raw in ratelimit_create
        drop(unsafe { Box::from_raw(handle.cast::<SlotTable>()) });
    }
}

/// 1 allowed, 0 denied, -1 no slot within the probe bound, -2 invalid argument
///
/// # Safety
///
/// `handle` must be null or a live handle
#[no_mangle]
pub unsafe extern "C" fn ratelimit_check(handle: *mut c_void, identity: u64, count: u32) -> c_int {
    // SAFETY: forwarded caller contract
    let Some(table) = (unsafe { table(handle) }) else {
        return abi::INVALID_ARGUMENT;
    };
    match table.check(identity, count) {
        Ok(Decision::Allowed) => abi::ALLOWED,
        Ok(Decision::Denied) => abi::DENIED,
        Err(error) => error_code(&error),
    }
}

/// Requests left in the window, or -2 for invalid arguments
///
/// # Safety
///
/// `handle` must be null or a live handle
#[no_mangle]
pub unsafe extern "C" fn ratelimit_remaining(handle: *mut c_void, identity: u64) -> i64 {
    // SAFETY: forwarded caller contract
    let Some(table) = (unsafe { table(handle) }) else {
        return i64::from(abi::INVALID_ARGUMENT);
    };
    table
        .remaining(identity)
        .map_or(i64::from(abi::INVALID_ARGUMENT), i64::from)
}

/// Non-consuming view of one identity's window
///
/// Writes the remaining quota and the milliseconds until the oldest counted
/// request expires. Returns 1 when another request would be admitted, 0 when
/// the window is spent, -2 for invalid arguments. Never claims a slot.
///
/// # Safety
///
/// `handle` must be null or a live handle; both out pointers must be null or writable
#[no_mangle]
pub unsafe extern "C" fn ratelimit_peek(
    handle: *mut c_void,
    identity: u64,
    remaining: *mut u32,
    reset_ms: *mut u64,
) -> c_int {
    if remaining.is_null() || reset_ms.is_null() {
        return abi::INVALID_ARGUMENT;
    }
    // SAFETY: forwarded caller contract
    let Some(table) = (unsafe { table(handle) }) else {
        return abi::INVALID_ARGUMENT;
    };
    match table.peek(identity) {
        Ok(status) => {
            // SAFETY: both pointers checked non-null and writable per contract
            unsafe {
                remaining.write(status.remaining);
                reset_ms.write(status.reset_after_ms);
            }
            if status.allowed {
                abi::ALLOWED
            } else {
                abi::DENIED
            }
        }
        Err(error) => error_code(&error),
    }
}

/// Milliseconds until the oldest counted request expires; 0 when nothing is counted
///
/// # Safety
///
/// `handle` must be null or a live handle
#[no_mangle]
pub unsafe extern "C" fn ratelimit_reset_ms(handle: *mut c_void, identity: u64) -> u64 {
    // SAFETY: forwarded caller contract
    unsafe { table(handle) }.map_or(0, |table| table.reset_after(identity).unwrap_or(0))
}

/// Zero one identity's counters
///
/// # Safety
///
/// `handle` must be null or a live handle
#[no_mangle]
pub unsafe extern "C" fn ratelimit_reset_user(handle: *mut c_void, identity: u64) -> c_int {
    // SAFETY: forwarded caller contract
    let Some(table) = (unsafe { table(handle) }) else {
        return abi::INVALID_ARGUMENT;
    };
    match table.reset_user(identity) {
        Ok(()) => abi::OK,
        Err(error) => error_code(&error),
    }
}

/// Zero the whole table
///
/// # Safety
///
/// `handle` must be null or a live handle
#[no_mangle]
pub unsafe extern "C" fn ratelimit_clear_all(handle: *mut c_void) -> c_int {
    // SAFETY: forwarded caller contract
    let Some(table) = (unsafe { table(handle) }) else {
        return abi::INVALID_ARGUMENT;
    };
    table.clear_all();
    abi::OK
}

/// Write the number of claimed slots and live-window requests
///
/// # Safety
///
/// `handle` must be null or a live handle; both out pointers must be null or writable
#[no_mangle]
pub unsafe extern "C" fn ratelimit_stats(
    handle: *mut c_void,
    active_users: *mut usize,
    total_requests: *mut u64,
) -> c_int {
    if active_users.is_null() || total_requests.is_null() {
        return abi::INVALID_ARGUMENT;
    }
    // SAFETY: forwarded caller contract
    let Some(table) = (unsafe { table(handle) }) else {
        return abi::INVALID_ARGUMENT;
    };
    let stats = table.stats();
    // SAFETY: both pointers checked non-null and writable per contract
    unsafe {
        active_users.write(stats.active_identities);
        total_requests.write(stats.total_requests);
    }
    abi::OK
}
