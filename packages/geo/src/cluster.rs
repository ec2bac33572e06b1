//! Greedy proximity clustering for heatmap rendering.
//!
//! Single pass in input order: the first unassigned record seeds a
//! cluster, then every remaining unassigned record within the zoom
//! radius of the cluster's *current* centroid is absorbed, with the
//! centroid recomputed as the running mean after each absorption. The
//! centroid therefore drifts as members accrue and the output depends
//! on input iteration order; callers that need reproducible clusters
//! must preserve snapshot order.
//!
//! O(n²) over the snapshot. Fine at municipal complaint volumes; the
//! entry points cap snapshot size rather than this module changing the
//! algorithm, since a different algorithm yields different clusters.

use civic_map_complaint_models::{ComplaintRecord, ComplaintStatus};
use serde::Serialize;

use crate::{haversine_km, zoom_radius_km};

/// Per-status member counts of a cluster.
///
/// Three-way on purpose: closed complaints count toward the cluster's
/// total but appear in no bucket, matching the heatmap's historical
/// semantics of not painting closed reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    /// Members with status pending.
    pub pending: u32,
    /// Members with status in_progress.
    #[serde(rename = "progress")]
    pub in_progress: u32,
    /// Members with status resolved.
    pub resolved: u32,
}

impl StatusBreakdown {
    fn absorb(&mut self, status: ComplaintStatus) {
        match status {
            ComplaintStatus::Pending => self.pending += 1,
            ComplaintStatus::InProgress => self.in_progress += 1,
            ComplaintStatus::Resolved => self.resolved += 1,
            ComplaintStatus::Closed => {}
        }
    }
}

/// A spatial grouping of complaints within the zoom radius.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    /// Centroid latitude (arithmetic mean of member latitudes).
    pub lat: f64,
    /// Centroid longitude (arithmetic mean of member longitudes).
    pub lng: f64,
    /// Total member count, closed complaints included.
    pub count: u32,
    /// Member counts by status, closed complaints excluded.
    pub status_breakdown: StatusBreakdown,
}

/// Running centroid state while a cluster is being built.
struct Builder {
    sum_lat: f64,
    sum_lng: f64,
    count: u32,
    breakdown: StatusBreakdown,
}

impl Builder {
    fn seed(lat: f64, lng: f64, status: ComplaintStatus) -> Self {
        let mut breakdown = StatusBreakdown::default();
        breakdown.absorb(status);
        Self {
            sum_lat: lat,
            sum_lng: lng,
            count: 1,
            breakdown,
        }
    }

    fn centroid(&self) -> (f64, f64) {
        (
            self.sum_lat / f64::from(self.count),
            self.sum_lng / f64::from(self.count),
        )
    }

    fn absorb(&mut self, lat: f64, lng: f64, status: ComplaintStatus) {
        self.sum_lat += lat;
        self.sum_lng += lng;
        self.count += 1;
        self.breakdown.absorb(status);
    }

    fn finish(self) -> Cluster {
        let (lat, lng) = self.centroid();
        Cluster {
            lat,
            lng,
            count: self.count,
            status_breakdown: self.breakdown,
        }
    }
}

/// Buckets complaints into proximity clusters at a map zoom level.
///
/// Records without usable coordinates are skipped. An empty snapshot
/// yields an empty vector.
#[must_use]
pub fn cluster(complaints: &[ComplaintRecord], zoom: u8) -> Vec<Cluster> {
    let radius_km = zoom_radius_km(zoom);

    // Only located records participate; keep their input order.
    let located: Vec<(f64, f64, ComplaintStatus)> = complaints
        .iter()
        .filter_map(|c| {
            let (lat, lng) = c.coordinates()?;
            Some((lat, lng, c.status()))
        })
        .collect();

    let mut assigned = vec![false; located.len()];
    let mut clusters = Vec::new();

    for seed_idx in 0..located.len() {
        if assigned[seed_idx] {
            continue;
        }
        assigned[seed_idx] = true;

        let (seed_lat, seed_lng, seed_status) = located[seed_idx];
        let mut builder = Builder::seed(seed_lat, seed_lng, seed_status);

        for candidate_idx in (seed_idx + 1)..located.len() {
            if assigned[candidate_idx] {
                continue;
            }
            let (lat, lng, status) = located[candidate_idx];
            let (centroid_lat, centroid_lng) = builder.centroid();
            if haversine_km(centroid_lat, centroid_lng, lat, lng) <= radius_km {
                assigned[candidate_idx] = true;
                builder.absorb(lat, lng, status);
            }
        }

        clusters.push(builder.finish());
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_map_complaint_models::ComplaintRecord;

    fn at(lat: f64, lng: f64, status: ComplaintStatus) -> ComplaintRecord {
        let mut c = ComplaintRecord::default();
        c.address.latitude = Some(lat);
        c.address.longitude = Some(lng);
        c.situation.status = status;
        c
    }

    #[test]
    fn empty_snapshot_yields_no_clusters() {
        assert!(cluster(&[], 10).is_empty());
    }

    #[test]
    fn merges_neighbors_and_isolates_outliers() {
        // ~0.55 km apart at the equator, well inside the 1 km radius of
        // zoom 10; the third record is hundreds of km away.
        let complaints = vec![
            at(0.0, 0.0, ComplaintStatus::Pending),
            at(0.0, 0.005, ComplaintStatus::Pending),
            at(10.0, 10.0, ComplaintStatus::Pending),
        ];
        let clusters = cluster(&complaints, 10);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count, 2);
        assert_eq!(clusters[1].count, 1);
    }

    #[test]
    fn centroid_is_mean_of_members() {
        let complaints = vec![
            at(0.0, 0.0, ComplaintStatus::Pending),
            at(0.0, 0.004, ComplaintStatus::Pending),
        ];
        let clusters = cluster(&complaints, 10);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].lat.abs() < 1e-9);
        assert!((clusters[0].lng - 0.002).abs() < 1e-9);
    }

    #[test]
    fn breakdown_counts_match_member_count_without_closed() {
        let complaints = vec![
            at(0.0, 0.0, ComplaintStatus::Pending),
            at(0.0, 0.001, ComplaintStatus::InProgress),
            at(0.0, 0.002, ComplaintStatus::Resolved),
            at(0.0, 0.003, ComplaintStatus::Pending),
        ];
        let clusters = cluster(&complaints, 10);
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        let b = c.status_breakdown;
        assert_eq!(c.count, b.pending + b.in_progress + b.resolved);
    }

    #[test]
    fn closed_members_count_but_have_no_bucket() {
        let complaints = vec![
            at(0.0, 0.0, ComplaintStatus::Pending),
            at(0.0, 0.001, ComplaintStatus::Closed),
        ];
        let clusters = cluster(&complaints, 10);
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!(c.count, 2);
        let b = c.status_breakdown;
        assert_eq!(b.pending + b.in_progress + b.resolved, 1);
    }

    #[test]
    fn members_within_radius_at_absorption_time() {
        let radius = crate::zoom_radius_km(10);
        let lngs = [0.0, 0.005, 0.009];
        let complaints: Vec<ComplaintRecord> = lngs
            .iter()
            .map(|&lng| at(0.0, lng, ComplaintStatus::Pending))
            .collect();

        // The third point is just over the radius from the seed, so only
        // the centroid drift after the second absorption lets it join.
        assert!(haversine_km(0.0, lngs[0], 0.0, lngs[2]) > radius);

        let clusters = cluster(&complaints, 10);
        assert_eq!(clusters.len(), 1);

        // Replay the single pass: every member must be within the radius
        // of the centroid as it stood when that member was absorbed.
        let mut sum = lngs[0];
        let mut count = 1.0;
        for &lng in &lngs[1..] {
            assert!(haversine_km(0.0, sum / count, 0.0, lng) <= radius);
            sum += lng;
            count += 1.0;
        }
        assert!((clusters[0].lng - sum / count).abs() < 1e-9);
        assert!(clusters[0].lat.abs() < 1e-9);
    }

    #[test]
    fn unlocated_records_are_skipped() {
        let complaints = vec![
            ComplaintRecord::default(),
            at(0.0, 0.0, ComplaintStatus::Pending),
            {
                let mut c = at(200.0, 0.0, ComplaintStatus::Pending);
                c.address.latitude = Some(200.0); // out of range
                c
            },
        ];
        let clusters = cluster(&complaints, 10);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count, 1);
    }

    #[test]
    fn first_seen_record_seeds_the_cluster() {
        // Input order decides seeds: reversing the input changes which
        // record opens the cluster but not the membership here.
        let a = at(0.0, 0.0, ComplaintStatus::Pending);
        let b = at(0.0, 0.005, ComplaintStatus::Pending);
        let forward = cluster(&[a.clone(), b.clone()], 10);
        let backward = cluster(&[b, a], 10);
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_eq!(forward[0].count, backward[0].count);
    }
}
