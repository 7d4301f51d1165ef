// ABOUTME: Runtime bindings to the native geo and rate limiter shared libraries
// ABOUTME: Library loading, symbol resolution, and safe wrappers over the C ABI
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Native bindings
//!
//! Each library is bound as a table of `extern "C"` function pointers. A
//! binding created from a loaded [`libloading::Library`] keeps the library
//! alive for as long as any copy of the binding exists.

// Symbol resolution and C ABI calls are the only unsafe surface of this crate
#![allow(unsafe_code)]

/// Shared-library discovery and loading
pub mod loader;

/// Geohash and distance bindings
pub mod geo;

/// Rate limiter bindings
pub mod ratelimit;

pub use geo::{GeoSymbols, NativeGeo};
pub use loader::FfiRuntime;
pub use ratelimit::{NativeRateLimit, NativeTable, RateLimitSymbols};

use std::path::PathBuf;
use thiserror::Error;

/// Why a native library was not bound
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// Native acceleration switched off by configuration
    #[error("native acceleration disabled by configuration")]
    Disabled,

    /// The platform cannot load shared libraries
    #[error("no FFI runtime available on this platform")]
    RuntimeUnavailable,

    /// No native directory configured and the executable path is unknown
    #[error("native library directory could not be determined")]
    DirectoryUnknown,

    /// The library file does not exist
    #[error("library not found at {}", .0.display())]
    LibraryMissing(PathBuf),

    /// The dynamic loader rejected the library
    #[error("failed to load {}: {reason}", .path.display())]
    LoadFailed {
        /// Library path
        path: PathBuf,
        /// Loader error message
        reason: String,
    },

    /// A required export is absent
    #[error("symbol {symbol} missing from {library}")]
    MissingSymbol {
        /// Library stem
        library: &'static str,
        /// Missing export
        symbol: &'static str,
    },
}
