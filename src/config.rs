// ABOUTME: Environment-based configuration for native probing and rate limiter defaults
// ABOUTME: Parses the MUSCLEMAP_* variables once into a typed AccelConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-only configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `MUSCLEMAP_DISABLE_NATIVE` | off |
//! | `MUSCLEMAP_NATIVE_DIR` | directory of the running executable |
//! | `MUSCLEMAP_RATELIMIT_FAILURE_POLICY` | `closed` |
//! | `MUSCLEMAP_RATELIMIT_CAPACITY` | 10000 |
//! | `MUSCLEMAP_RATELIMIT_LIMIT` | 60 |
//! | `MUSCLEMAP_RATELIMIT_WINDOW_SECONDS` | 60 (1 to 3600) |

use musclemap_core::constants::{env_config, rate_limit};
use musclemap_core::Decision;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// How a rate-limit check is answered when no quota decision could be made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Deny the request
    #[default]
    Closed,
    /// Allow the request
    Open,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "fail-open" | "fail_open" => Ok(Self::Open),
            "closed" | "fail-closed" | "fail_closed" => Ok(Self::Closed),
            other => Err(format!("unknown failure policy '{other}'")),
        }
    }
}

impl FailurePolicy {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Decision substituted for an undecidable check
    #[must_use]
    pub const fn decision(self) -> Decision {
        match self {
            Self::Closed => Decision::Denied,
            Self::Open => Decision::Allowed,
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Acceleration layer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccelConfig {
    /// Skip native probing entirely
    pub disable_native: bool,
    /// Directory holding the shared libraries; `None` means next to the executable
    pub native_dir: Option<PathBuf>,
    /// Policy for undecidable rate-limit checks
    pub failure_policy: FailurePolicy,
    /// Slot count of limiters built from configuration
    pub rate_limit_capacity: usize,
    /// Requests per window of limiters built from configuration
    pub rate_limit_limit: u32,
    /// Window length in seconds of limiters built from configuration
    pub rate_limit_window_seconds: u32,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            disable_native: false,
            native_dir: None,
            failure_policy: FailurePolicy::default(),
            rate_limit_capacity: rate_limit::DEFAULT_CAPACITY,
            rate_limit_limit: rate_limit::DEFAULT_LIMIT,
            rate_limit_window_seconds: rate_limit::DEFAULT_WINDOW_SECONDS,
        }
    }
}

impl AccelConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            disable_native: env::var(env_config::DISABLE_NATIVE).is_ok_and(|v| is_truthy(&v)),
            native_dir: env::var_os(env_config::NATIVE_DIR)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            failure_policy: env::var(env_config::FAILURE_POLICY)
                .map_or(FailurePolicy::default(), |v| parse_policy(&v)),
            rate_limit_capacity: parse_positive(
                env_config::RATELIMIT_CAPACITY,
                rate_limit::DEFAULT_CAPACITY,
            ),
            rate_limit_limit: parse_or_default(
                env_config::RATELIMIT_LIMIT,
                rate_limit::DEFAULT_LIMIT,
            ),
            rate_limit_window_seconds: parse_window(env_config::RATELIMIT_WINDOW),
        }
    }

    /// Configuration that never probes native libraries
    #[must_use]
    pub fn fallback_only() -> Self {
        Self {
            disable_native: true,
            ..Self::default()
        }
    }

    /// Directory searched for the shared libraries
    ///
    /// `None` when no directory is configured and the executable path cannot
    /// be determined.
    #[must_use]
    pub fn resolved_native_dir(&self) -> Option<PathBuf> {
        self.native_dir.clone().or_else(|| {
            env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(PathBuf::from))
        })
    }
}

/// Boolean-style environment value (`1`, `true`, `yes`, `on`)
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or_default<T: FromStr + fmt::Display + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %raw, default = %default, "Unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn parse_policy(raw: &str) -> FailurePolicy {
    raw.parse().unwrap_or_else(|error| {
        warn!(
            variable = env_config::FAILURE_POLICY,
            value = %raw,
            %error,
            default = %FailurePolicy::default(),
            "Unrecognized failure policy, using default"
        );
        FailurePolicy::default()
    })
}

fn parse_window(key: &str) -> u32 {
    let default = rate_limit::DEFAULT_WINDOW_SECONDS;
    match parse_or_default(key, default) {
        seconds @ 1..=rate_limit::MAX_WINDOW_SECONDS => seconds,
        seconds => {
            warn!(variable = key, seconds, default, "Window must be 1 to 3600 seconds, using default");
            default
        }
    }
}

fn parse_positive(key: &str, default: usize) -> usize {
    match parse_or_default(key, default) {
        0 => {
            warn!(variable = key, default, "Zero is not a valid capacity, using default");
            default
        }
        value => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, logs.text())
    }

    #[test]
    fn test_truthy_values() {
        for value in ["1", "true", "TRUE", "yes", "On", " on "] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["0", "false", "no", "off", "", "enabled"] {
            assert!(!is_truthy(value), "{value}");
        }
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!(FailurePolicy::from_str_or_default("open"), FailurePolicy::Open);
        assert_eq!(FailurePolicy::from_str_or_default("OPEN"), FailurePolicy::Open);
        assert_eq!(FailurePolicy::from_str_or_default("closed"), FailurePolicy::Closed);
        assert_eq!(FailurePolicy::from_str_or_default("bogus"), FailurePolicy::Closed);
        assert_eq!("fail_closed".parse(), Ok(FailurePolicy::Closed));
        assert!("sometimes".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::Open.decision(), Decision::Allowed);
        assert_eq!(FailurePolicy::Closed.decision(), Decision::Denied);
        assert_eq!(FailurePolicy::Open.to_string(), "open");
    }

    #[test]
    fn test_unrecognized_policy_warns() {
        let (policy, logs) = with_captured_logs(|| parse_policy("sometimes"));
        assert_eq!(policy, FailurePolicy::Closed);
        assert!(logs.contains("Unrecognized failure policy"), "{logs}");
        assert!(logs.contains("sometimes"), "{logs}");

        let (policy, logs) = with_captured_logs(|| parse_policy(" Open "));
        assert_eq!(policy, FailurePolicy::Open);
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn test_fallback_only_keeps_defaults() {
        let config = AccelConfig::fallback_only();
        assert!(config.disable_native);
        assert_eq!(config.rate_limit_capacity, rate_limit::DEFAULT_CAPACITY);
        assert_eq!(config.failure_policy, FailurePolicy::Closed);
    }

    #[test]
    fn test_explicit_native_dir_wins() {
        let config = AccelConfig {
            native_dir: Some(PathBuf::from("/opt/musclemap/lib")),
            ..AccelConfig::default()
        };
        assert_eq!(
            config.resolved_native_dir(),
            Some(PathBuf::from("/opt/musclemap/lib"))
        );
    }
}
