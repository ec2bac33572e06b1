#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geographic aggregation over complaint snapshots.
//!
//! The two consumers are the heatmap endpoint (proximity clustering at a
//! map zoom level) and the relevant-complaints endpoint (batch-relative
//! relevance ranking). Both operate on an in-memory snapshot the caller
//! already fetched from the store; nothing here touches I/O or shared
//! state, so every function is a pure computation over its inputs.
//!
//! Records without usable coordinates are skipped by the geographic
//! operations rather than failing the batch, and empty snapshots produce
//! empty outputs.

pub mod cluster;
pub mod relevance;

pub use cluster::{Cluster, StatusBreakdown, cluster};
pub use relevance::{ScoredComplaint, rank};

use civic_map_complaint_models::ComplaintRecord;

/// Mean Earth radius in kilometers, used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radius applied when the zoom level is absent or outside the table.
pub const DEFAULT_RADIUS_KM: f64 = 1.0;

/// Maps a map zoom level (1-15) to a clustering radius in kilometers.
///
/// Low zoom levels see a whole region and merge aggressively; high zoom
/// levels see a few blocks and barely merge at all. Unrecognized levels
/// fall back to [`DEFAULT_RADIUS_KM`] rather than erroring.
#[must_use]
pub const fn zoom_radius_km(zoom: u8) -> f64 {
    match zoom {
        1 => 50.0,
        2 => 30.0,
        3 => 20.0,
        4 => 15.0,
        5 => 10.0,
        6 => 8.0,
        7 => 5.0,
        8 => 3.0,
        9 => 2.0,
        10 => 1.0,
        11 => 0.8,
        12 => 0.5,
        13 => 0.3,
        14 => 0.2,
        15 => 0.1,
        _ => DEFAULT_RADIUS_KM,
    }
}

/// Great-circle distance between two points in kilometers (Haversine).
#[must_use]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Complaints within `radius_km` of a center point, paired with their
/// distance in kilometers and sorted nearest-first.
///
/// Records without usable coordinates are skipped. Ties keep input order
/// (stable sort).
#[must_use]
pub fn nearby(
    complaints: &[ComplaintRecord],
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> Vec<(ComplaintRecord, f64)> {
    let mut matches: Vec<(ComplaintRecord, f64)> = complaints
        .iter()
        .filter_map(|complaint| {
            let (lat, lng) = complaint.coordinates()?;
            let distance = haversine_km(latitude, longitude, lat, lng);
            (distance <= radius_km).then(|| (complaint.clone(), distance))
        })
        .collect();

    matches.sort_by(|a, b| a.1.total_cmp(&b.1));
    matches
}
