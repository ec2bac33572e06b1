//! Batch-relative relevance ranking.
//!
//! A complaint's raw score blends three signals: how many similar
//! complaints were merged into it (log-dampened so the hundredth
//! duplicate moves the needle less than the second), its classified
//! priority, and a recency term that decays with age. Raw scores are
//! then normalized against the batch maximum so the top complaint of
//! any non-empty batch lands at 100, which keeps the scale readable on
//! a dashboard regardless of how active the city is.
//!
//! Scores are comparable only within one batch. Re-ranking the same
//! complaint in a different batch can change its number without
//! anything about the complaint changing.

use chrono::{DateTime, Utc};
use civic_map_complaint_models::{ComplaintRecord, classify};
use serde::Serialize;

const SIMILARITY_WEIGHT: f64 = 0.5;
const PRIORITY_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.2;

/// Age assumed for records missing `createdAt`, pushing their recency
/// term toward zero instead of treating them as brand new.
const STALE_AGE_DAYS: f64 = 3650.0;

/// Floor for the batch maximum so an all-zero batch divides cleanly.
const MIN_RAW_MAX: f64 = 1e-5;

/// A complaint paired with its batch-relative relevance score (0-100).
#[derive(Debug, Clone, Serialize)]
pub struct ScoredComplaint {
    /// The scored complaint.
    #[serde(flatten)]
    pub complaint: ComplaintRecord,
    /// Normalized relevance within the batch; the batch maximum is 100.
    pub relevance_score: u8,
}

fn raw_score(complaint: &ComplaintRecord, now: DateTime<Utc>) -> f64 {
    let similarity = f64::from(complaint.similar_count + 1).log2();

    let priority = f64::from(classify(complaint, now).rank());

    let age_days = complaint.created_at.map_or(STALE_AGE_DAYS, |created_at| {
        let days = (now - created_at).num_days().max(0);
        // num_days of a bounded DateTime difference fits f64 exactly enough
        #[allow(clippy::cast_precision_loss)]
        {
            days as f64
        }
    });
    let recency = 1.0 / (1.0 + age_days);

    SIMILARITY_WEIGHT * similarity + PRIORITY_WEIGHT * priority + RECENCY_WEIGHT * recency
}

/// Scores a batch of complaints and returns the top `limit`, most
/// relevant first.
///
/// Normalization divides by the batch maximum (floored at a small
/// epsilon), so any non-empty batch has at least one score of 100.
/// Sorting is stable: equal scores keep their input order. An empty
/// batch yields an empty vector.
#[must_use]
pub fn rank(complaints: &[ComplaintRecord], now: DateTime<Utc>, limit: usize) -> Vec<ScoredComplaint> {
    let raw: Vec<f64> = complaints.iter().map(|c| raw_score(c, now)).collect();
    let raw_max = raw.iter().copied().fold(MIN_RAW_MAX, f64::max);

    let mut scored: Vec<ScoredComplaint> = complaints
        .iter()
        .zip(&raw)
        .map(|(complaint, &score)| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let relevance_score = (score / raw_max * 100.0).round() as u8;
            ScoredComplaint {
                complaint: complaint.clone(),
                relevance_score,
            }
        })
        .collect();

    scored.sort_by_key(|s| std::cmp::Reverse(s.relevance_score));
    scored.truncate(limit);
    scored
}
