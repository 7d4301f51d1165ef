// ABOUTME: Native geohash codec and great-circle distance library
// ABOUTME: Exposes the C ABI consumed by the dispatch layer's dynamic loader
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # `MuscleMap` Geo
//!
//! Geohash encoding/decoding over fixed-size byte buffers and haversine
//! distance math. The [`ffi`] module exports these as `extern "C"` symbols;
//! the shared library built from this crate is what the dispatch layer
//! probes for at startup.

/// Geohash bit-interleaving codec
pub mod geohash;

/// Haversine distance, radius containment, bounding boxes
pub mod distance;

/// C ABI exports
pub mod ffi;
