// ABOUTME: MuscleMap acceleration CLI - inspects backend selection and runs geo primitives
// ABOUTME: Prints the capability report as JSON and answers one-off geohash and distance queries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Show which backend each library resolved to, and why
//! musclemap-accel status
//!
//! # Encode New York at the default precision
//! musclemap-accel encode 40.7128 -74.0060
//!
//! # Decode a geohash to its cell center
//! musclemap-accel decode dr5regw3p
//!
//! # Distance between two points in meters
//! musclemap-accel distance 40.7128 -74.0060 51.5074 -0.1278
//!
//! # Force the pure fallbacks
//! MUSCLEMAP_DISABLE_NATIVE=1 musclemap-accel status
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use musclemap_accel::constants::geohash;
use musclemap_accel::logging::LoggingConfig;
use musclemap_accel::{CapabilityRegistry, Direction, GeohashPrecision};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "musclemap-accel",
    about = "MuscleMap native acceleration layer",
    long_about = "Inspect native library selection and run geohash and distance primitives through the dispatch layer."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the capability report as JSON
    Status,

    /// Encode a coordinate as a geohash
    Encode {
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        lng: f64,

        /// Geohash length, clamped to 1..=12
        #[arg(long, short = 'p', default_value_t = i64::from(geohash::DEFAULT_PRECISION))]
        precision: i64,
    },

    /// Decode a geohash to the center of its cell
    Decode {
        /// Geohash
        hash: String,
    },

    /// List the eight neighboring cells of a geohash
    Neighbors {
        /// Geohash
        hash: String,
    },

    /// Great-circle distance between two points in meters
    Distance {
        /// First latitude
        #[arg(allow_negative_numbers = true)]
        lat1: f64,

        /// First longitude
        #[arg(allow_negative_numbers = true)]
        lng1: f64,

        /// Second latitude
        #[arg(allow_negative_numbers = true)]
        lat2: f64,

        /// Second longitude
        #[arg(allow_negative_numbers = true)]
        lng2: f64,
    },

    /// Bounding box around a point
    Bbox {
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        lng: f64,

        /// Radius in meters
        radius: f64,
    },

    /// Coarsest precision whose cells fit inside a search radius
    Precision {
        /// Radius in meters
        radius: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    logging.init()?;

    let registry = CapabilityRegistry::global();
    let geo = registry.geo();
    debug!(backend = %geo.backend(), "Geo service ready");

    match cli.command {
        Command::Status => {
            let report = serde_json::to_string_pretty(registry.report())
                .context("Failed to serialize capability report")?;
            println!("{report}");
        }
        Command::Encode {
            lat,
            lng,
            precision,
        } => {
            let hash = geo
                .encode(lat, lng, GeohashPrecision::clamped(precision))
                .with_context(|| format!("Cannot encode ({lat}, {lng})"))?;
            println!("{hash}");
        }
        Command::Decode { hash } => {
            let center = geo
                .decode(&hash)
                .with_context(|| format!("Cannot decode '{hash}'"))?;
            println!("{} {}", center.lat(), center.lng());
        }
        Command::Neighbors { hash } => {
            let cells = geo
                .neighbors(&hash)
                .with_context(|| format!("Cannot compute neighbors of '{hash}'"))?;
            for (direction, cell) in Direction::ALL.iter().zip(&cells) {
                println!("{direction:?}\t{cell}");
            }
        }
        Command::Distance {
            lat1,
            lng1,
            lat2,
            lng2,
        } => {
            let meters = geo
                .haversine(lat1, lng1, lat2, lng2)
                .context("Cannot compute distance")?;
            println!("{meters:.3}");
        }
        Command::Bbox { lat, lng, radius } => {
            let bbox = geo
                .bounding_box(lat, lng, radius)
                .context("Cannot compute bounding box")?;
            let json = serde_json::to_string_pretty(&bbox)
                .context("Failed to serialize bounding box")?;
            println!("{json}");
        }
        Command::Precision { radius } => {
            let precision = geo.optimal_precision(radius);
            let (lat_error, lng_error) = geo.precision_error(precision);
            println!("{precision}\t±{lat_error}° lat\t±{lng_error}° lng");
        }
    }

    Ok(())
}
