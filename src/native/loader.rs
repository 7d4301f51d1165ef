// ABOUTME: Locates and opens the native shared libraries with platform-specific file names
// ABOUTME: Reports missing files, loader errors, and missing exports as probe failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::ProbeFailure;
use libloading::{library_filename, Library};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Whether this platform can load C shared libraries at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiRuntime {
    /// `dlopen` / `LoadLibrary` is available
    Available,
    /// No dynamic loader on this target
    Unavailable,
}

impl FfiRuntime {
    /// Detect the runtime for the compilation target
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(any(unix, windows)) {
            Self::Available
        } else {
            Self::Unavailable
        }
    }

    /// Whether libraries can be loaded
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Platform file name of `stem` inside `dir` (`lib<stem>.so`, `lib<stem>.dylib`, `<stem>.dll`)
#[must_use]
pub fn library_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(library_filename(stem))
}

/// Open the library `stem` from `dir`
///
/// # Errors
///
/// `LibraryMissing` when the file does not exist, `LoadFailed` when the
/// dynamic loader rejects it
pub fn open(dir: &Path, stem: &str) -> Result<(Arc<Library>, PathBuf), ProbeFailure> {
    let path = library_path(dir, stem);
    if !path.is_file() {
        return Err(ProbeFailure::LibraryMissing(path));
    }
    // SAFETY: loading runs the library's initializers; the native libraries
    // built from this workspace have none beyond the Rust runtime's own
    let library = unsafe { Library::new(&path) }.map_err(|e| ProbeFailure::LoadFailed {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok((Arc::new(library), path))
}

/// Resolve one export as a function pointer
///
/// # Safety
///
/// `T` must be the exact function pointer type of the export named `symbol`
pub(crate) unsafe fn symbol<T: Copy>(
    library: &Library,
    stem: &'static str,
    symbol: &'static str,
) -> Result<T, ProbeFailure> {
    // SAFETY: signature correctness is the caller's contract
    unsafe { library.get::<T>(symbol.as_bytes()) }
        .map(|resolved| *resolved)
        .map_err(|_| ProbeFailure::MissingSymbol {
            library: stem,
            symbol,
        })
}
