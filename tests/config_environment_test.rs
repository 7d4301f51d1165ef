// ABOUTME: Tests environment-driven configuration of probing, failure policy, and limiter sizing
// ABOUTME: Serialized because every test mutates process environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use musclemap_accel::constants::{env_config, rate_limit};
use musclemap_accel::logging::{LogFormat, LoggingConfig};
use musclemap_accel::{AccelConfig, Backend, CapabilityRegistry, FailurePolicy};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

const ALL_KEYS: [&str; 6] = [
    env_config::DISABLE_NATIVE,
    env_config::NATIVE_DIR,
    env_config::FAILURE_POLICY,
    env_config::RATELIMIT_CAPACITY,
    env_config::RATELIMIT_LIMIT,
    env_config::RATELIMIT_WINDOW,
];

fn clear_env() {
    for key in ALL_KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = AccelConfig::from_env();
    assert_eq!(config, AccelConfig::default());
    assert!(!config.disable_native);
    assert_eq!(config.failure_policy, FailurePolicy::Closed);
    assert_eq!(config.rate_limit_capacity, rate_limit::DEFAULT_CAPACITY);
    assert_eq!(config.rate_limit_limit, rate_limit::DEFAULT_LIMIT);
    assert_eq!(
        config.rate_limit_window_seconds,
        rate_limit::DEFAULT_WINDOW_SECONDS
    );
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var(env_config::DISABLE_NATIVE, "yes");
    env::set_var(env_config::NATIVE_DIR, "/opt/musclemap/native");
    env::set_var(env_config::FAILURE_POLICY, "fail-open");
    env::set_var(env_config::RATELIMIT_CAPACITY, "512");
    env::set_var(env_config::RATELIMIT_LIMIT, " 120 ");
    env::set_var(env_config::RATELIMIT_WINDOW, "900");

    let config = AccelConfig::from_env();
    assert!(config.disable_native);
    assert_eq!(
        config.native_dir,
        Some(PathBuf::from("/opt/musclemap/native"))
    );
    assert_eq!(config.failure_policy, FailurePolicy::Open);
    assert_eq!(config.rate_limit_capacity, 512);
    assert_eq!(config.rate_limit_limit, 120);
    assert_eq!(config.rate_limit_window_seconds, 900);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_values_fall_back_to_defaults() {
    clear_env();
    env::set_var(env_config::DISABLE_NATIVE, "maybe");
    env::set_var(env_config::NATIVE_DIR, "");
    env::set_var(env_config::FAILURE_POLICY, "sometimes");
    env::set_var(env_config::RATELIMIT_CAPACITY, "0");
    env::set_var(env_config::RATELIMIT_LIMIT, "-3");
    env::set_var(env_config::RATELIMIT_WINDOW, "0");

    let config = AccelConfig::from_env();
    assert!(!config.disable_native);
    assert_eq!(config.native_dir, None);
    assert_eq!(config.failure_policy, FailurePolicy::Closed);
    assert_eq!(config.rate_limit_capacity, rate_limit::DEFAULT_CAPACITY);
    assert_eq!(config.rate_limit_limit, rate_limit::DEFAULT_LIMIT);
    assert_eq!(
        config.rate_limit_window_seconds,
        rate_limit::DEFAULT_WINDOW_SECONDS
    );

    clear_env();
}

#[test]
#[serial]
fn test_window_bounds_from_environment() {
    clear_env();
    for (raw, expected) in [
        ("1", 1),
        ("3600", rate_limit::MAX_WINDOW_SECONDS),
        ("3601", rate_limit::DEFAULT_WINDOW_SECONDS),
        ("5000", rate_limit::DEFAULT_WINDOW_SECONDS),
        ("minute", rate_limit::DEFAULT_WINDOW_SECONDS),
    ] {
        env::set_var(env_config::RATELIMIT_WINDOW, raw);
        assert_eq!(
            AccelConfig::from_env().rate_limit_window_seconds,
            expected,
            "{raw}"
        );
    }

    env::set_var(env_config::RATELIMIT_WINDOW, "120");
    let registry = CapabilityRegistry::probe(&AccelConfig {
        disable_native: true,
        ..AccelConfig::from_env()
    });
    let limiter = registry.rate_limiter_from_config().unwrap();
    assert_eq!(limiter.window_seconds(), 120);

    clear_env();
}

#[test]
#[serial]
fn test_global_registry_honors_disable_switch() {
    clear_env();
    env::set_var(env_config::DISABLE_NATIVE, "1");
    env::set_var(env_config::FAILURE_POLICY, "open");
    env::set_var(env_config::RATELIMIT_LIMIT, "2");

    let registry = CapabilityRegistry::global();
    assert!(registry.report().native_disabled);
    assert_eq!(registry.geo_backend(), Backend::Fallback);
    assert_eq!(registry.rate_limit_backend(), Backend::Fallback);

    let limiter = registry.rate_limiter_from_config().unwrap();
    assert_eq!(limiter.policy(), FailurePolicy::Open);
    assert!(limiter.admit(5, 2));
    assert!(!limiter.admit(5, 1));

    // Probed once; later environment changes are not observed
    clear_env();
    assert!(std::ptr::eq(registry, CapabilityRegistry::global()));
    assert!(CapabilityRegistry::global().report().native_disabled);
}

#[test]
#[serial]
fn test_logging_config_from_environment() {
    env::set_var("LOG_FORMAT", "json");
    env::set_var("RUST_LOG", "debug");
    let config = LoggingConfig::from_env();
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, "debug");
    assert_eq!(config.with_level("warn").level, "warn");

    env::remove_var("LOG_FORMAT");
    env::remove_var("RUST_LOG");
    assert_eq!(LoggingConfig::from_env().format, LogFormat::Pretty);
}
