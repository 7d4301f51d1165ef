// ABOUTME: Capability registry deciding once per instance which backend serves each library
// ABOUTME: Probes the FFI runtime and shared libraries, records why, and hands out dispatched services
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Capability Registry
//!
//! Probing resolves each library from `unprobed` to `native` or `fallback`
//! exactly once; nothing is re-evaluated afterwards. A registry is an
//! ordinary value, so tests and embedders can hold several with different
//! configurations. [`CapabilityRegistry::global`] is the process-wide one
//! built from the environment.

use crate::config::{AccelConfig, FailurePolicy};
use crate::geo::GeoService;
use crate::native::{loader, FfiRuntime, NativeGeo, NativeRateLimit, ProbeFailure};
use crate::rate_limiter::RateLimiter;
use chrono::{DateTime, Utc};
use libloading::Library;
use musclemap_core::constants::libraries;
use musclemap_core::AccelResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Which implementation serves a library's calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The shared library via FFI
    Native,
    /// The pure Rust fallback
    Fallback,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Probe outcome of one library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStatus {
    /// Library stem
    pub library: String,
    /// Selected backend
    pub backend: Backend,
    /// File the native library was loaded from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Why the native library was not selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LibraryStatus {
    fn native(library: &str, path: Option<PathBuf>) -> Self {
        Self {
            library: library.to_owned(),
            backend: Backend::Native,
            path,
            reason: None,
        }
    }

    fn fallback(library: &str, reason: &ProbeFailure) -> Self {
        Self {
            library: library.to_owned(),
            backend: Backend::Fallback,
            path: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// What a registry found when it was built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityReport {
    /// Native acceleration switched off by configuration
    pub native_disabled: bool,
    /// The platform can load shared libraries
    pub ffi_runtime: bool,
    /// Geohash and distance library
    pub geo: LibraryStatus,
    /// Rate limiter library
    pub rate_limit: LibraryStatus,
    /// Policy for undecidable rate-limit checks
    pub failure_policy: FailurePolicy,
    /// When the probe ran
    pub probed_at: DateTime<Utc>,
}

/// Selected backends plus the configuration used to build services
pub struct CapabilityRegistry {
    geo: Option<NativeGeo>,
    rate_limit: Option<NativeRateLimit>,
    config: AccelConfig,
    report: CapabilityReport,
}

static GLOBAL: OnceLock<CapabilityRegistry> = OnceLock::new();

impl CapabilityRegistry {
    /// Probe the FFI runtime and both libraries as configured
    ///
    /// Never fails: every problem leaves the affected library on its fallback
    /// and is recorded in the report.
    #[must_use]
    pub fn probe(config: &AccelConfig) -> Self {
        let runtime = FfiRuntime::detect();
        let (geo, rate_limit) = if config.disable_native {
            (Err(ProbeFailure::Disabled), Err(ProbeFailure::Disabled))
        } else if !runtime.is_available() {
            (
                Err(ProbeFailure::RuntimeUnavailable),
                Err(ProbeFailure::RuntimeUnavailable),
            )
        } else if let Some(dir) = config.resolved_native_dir() {
            (
                bind(&dir, libraries::GEO, NativeGeo::bind),
                bind(&dir, libraries::RATE_LIMIT, NativeRateLimit::bind),
            )
        } else {
            (
                Err(ProbeFailure::DirectoryUnknown),
                Err(ProbeFailure::DirectoryUnknown),
            )
        };

        let geo_status = status(libraries::GEO, &geo);
        let rate_limit_status = status(libraries::RATE_LIMIT, &rate_limit);
        let report = CapabilityReport {
            native_disabled: config.disable_native,
            ffi_runtime: runtime.is_available(),
            geo: geo_status,
            rate_limit: rate_limit_status,
            failure_policy: config.failure_policy,
            probed_at: Utc::now(),
        };

        let registry = Self {
            geo: geo.ok().map(|(binding, _)| binding),
            rate_limit: rate_limit.ok().map(|(binding, _)| binding),
            config: config.clone(),
            report,
        };
        registry.log_selection();
        registry
    }

    /// Registry that never touches native libraries
    #[must_use]
    pub fn fallback_only() -> Self {
        Self::probe(&AccelConfig::fallback_only())
    }

    /// Registry over bindings created by the caller
    ///
    /// `None` selects the fallback for that library. Limiters built from
    /// configuration use the default capacity and limit.
    #[must_use]
    pub fn from_bindings(
        geo: Option<NativeGeo>,
        rate_limit: Option<NativeRateLimit>,
        policy: FailurePolicy,
    ) -> Self {
        let config = AccelConfig {
            failure_policy: policy,
            ..AccelConfig::default()
        };
        let supplied = |library: &str, bound: bool| {
            if bound {
                LibraryStatus::native(library, None)
            } else {
                LibraryStatus::fallback(library, &ProbeFailure::Disabled)
            }
        };
        let report = CapabilityReport {
            native_disabled: geo.is_none() && rate_limit.is_none(),
            ffi_runtime: FfiRuntime::detect().is_available(),
            geo: supplied(libraries::GEO, geo.is_some()),
            rate_limit: supplied(libraries::RATE_LIMIT, rate_limit.is_some()),
            failure_policy: policy,
            probed_at: Utc::now(),
        };
        Self {
            geo,
            rate_limit,
            config,
            report,
        }
    }

    /// Process-wide registry probed from the environment on first use
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| Self::probe(&AccelConfig::from_env()))
    }

    fn log_selection(&self) {
        for status in [&self.report.geo, &self.report.rate_limit] {
            match status.backend {
                Backend::Native => info!(
                    library = %status.library,
                    backend = %status.backend,
                    path = ?status.path,
                    "Native library bound"
                ),
                Backend::Fallback if self.report.native_disabled => debug!(
                    library = %status.library,
                    backend = %status.backend,
                    "Native acceleration disabled, using fallback"
                ),
                Backend::Fallback => warn!(
                    library = %status.library,
                    backend = %status.backend,
                    reason = status.reason.as_deref().unwrap_or_default(),
                    "Native library unavailable, using fallback"
                ),
            }
        }
    }

    /// Probe findings
    #[must_use]
    pub const fn report(&self) -> &CapabilityReport {
        &self.report
    }

    /// Configuration the registry was built with
    #[must_use]
    pub const fn config(&self) -> &AccelConfig {
        &self.config
    }

    /// Backend serving geo calls
    #[must_use]
    pub const fn geo_backend(&self) -> Backend {
        self.report.geo.backend
    }

    /// Backend serving new rate limiters
    #[must_use]
    pub const fn rate_limit_backend(&self) -> Backend {
        self.report.rate_limit.backend
    }

    /// Geo service on the selected backend
    #[must_use]
    pub fn geo(&self) -> GeoService {
        GeoService::from_binding(self.geo.clone())
    }

    /// New limiter on the selected backend with the configured failure policy
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when `capacity` is zero
    pub fn rate_limiter(&self, capacity: usize, limit: u32) -> AccelResult<RateLimiter> {
        RateLimiter::new(
            self.rate_limit.as_ref(),
            capacity,
            limit,
            self.config.failure_policy,
        )
    }

    /// [`Self::rate_limiter`] with a window of `window_seconds`
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when `capacity` is zero, `InvalidWindow` unless
    /// `window_seconds` is within 1 to 3600
    pub fn rate_limiter_with_window(
        &self,
        capacity: usize,
        limit: u32,
        window_seconds: u32,
    ) -> AccelResult<RateLimiter> {
        RateLimiter::with_window(
            self.rate_limit.as_ref(),
            capacity,
            limit,
            window_seconds,
            self.config.failure_policy,
        )
    }

    /// New limiter sized from configuration
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` when the configured capacity is zero
    pub fn rate_limiter_from_config(&self) -> AccelResult<RateLimiter> {
        self.rate_limiter_with_window(
            self.config.rate_limit_capacity,
            self.config.rate_limit_limit,
            self.config.rate_limit_window_seconds,
        )
    }
}

fn bind<T>(
    dir: &Path,
    stem: &str,
    resolve: impl FnOnce(Arc<Library>) -> Result<T, ProbeFailure>,
) -> Result<(T, PathBuf), ProbeFailure> {
    let (library, path) = loader::open(dir, stem)?;
    Ok((resolve(library)?, path))
}

fn status<T>(library: &str, probed: &Result<(T, PathBuf), ProbeFailure>) -> LibraryStatus {
    match probed {
        Ok((_, path)) => LibraryStatus::native(library, Some(path.clone())),
        Err(reason) => LibraryStatus::fallback(library, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_only_registry() {
        let registry = CapabilityRegistry::fallback_only();
        let report = registry.report();
        assert!(report.native_disabled);
        assert_eq!(report.geo.backend, Backend::Fallback);
        assert_eq!(report.rate_limit.backend, Backend::Fallback);
        assert!(report.geo.reason.is_some());
        assert_eq!(registry.geo().backend(), Backend::Fallback);
    }

    #[test]
    fn test_report_serializes_backends_lowercase() {
        let registry = CapabilityRegistry::from_bindings(None, None, FailurePolicy::Open);
        let json = serde_json::to_value(registry.report()).unwrap();
        assert_eq!(json["geo"]["backend"], "fallback");
        assert_eq!(json["failure_policy"], "open");
        assert!(json["geo"].get("path").is_none());
    }

    #[test]
    fn test_rate_limiter_from_config_uses_policy() {
        let registry = CapabilityRegistry::from_bindings(None, None, FailurePolicy::Open);
        let limiter = registry.rate_limiter_from_config().unwrap();
        assert_eq!(limiter.policy(), FailurePolicy::Open);
        assert_eq!(limiter.limit(), registry.config().rate_limit_limit);
        assert_eq!(
            limiter.window_seconds(),
            registry.config().rate_limit_window_seconds
        );
    }
}
