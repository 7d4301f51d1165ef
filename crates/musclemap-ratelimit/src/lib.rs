// ABOUTME: Native concurrent sliding-window rate limiter library
// ABOUTME: Exposes the slot table and the C ABI consumed by the dispatch layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `MuscleMap` Rate Limiter
//!
//! A fixed-capacity, linearly probed slot table counting requests per
//! identity over a sliding window of one-second buckets (60 by default, up
//! to an hour).
//!
//! ## Concurrency
//!
//! This is a striped-lock scheme with atomic counters, not a lock-free one:
//!
//! - slot claiming is a compare-and-swap on the slot identity, and bucket
//!   updates are atomic, so identities in different slots never contend;
//! - each slot carries its own admission guard so that "sum the window, then
//!   add" is atomic with respect to other writers of the same identity;
//! - a table-wide reader/writer lock is held shared by every per-identity
//!   operation and exclusively only by `clear_all`.
//!
//! Slot placement uses [`musclemap_core::hash::start_slot`], which the pure
//! fallback limiter shares so both reject the same identities.

mod slot;

/// Slot table
pub mod table;

/// C ABI exports
pub mod ffi;

pub use table::SlotTable;
