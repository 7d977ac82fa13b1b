//! Segment Aggregator
//!
//! Spreads each segment's revenue share evenly over its mapped codes and
//! routes every slice into a bucket by eligibility verdict. Threshold results
//! add three sub-buckets on top. Instrument figures are plain sums of the
//! segment buckets.

use std::iter::Sum;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use super::threshold::{ThresholdOutcome, ThresholdVerdict};
use crate::reference::Eligibility;

/// Weighted revenue buckets for a segment or an instrument
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Buckets {
    /// Eligible without further testing
    pub aligned: f64,
    /// Eligible, further testing needed
    pub additional_testing_required: f64,
    pub not_in_scope: f64,
    /// No industry code could be derived
    pub other: f64,
    pub aligned_pass: f64,
    pub aligned_no_data: f64,
    pub aligned_not_in_scope: f64,
}

impl Buckets {
    /// Aligned + additional testing + not in scope + other
    pub fn total(&self) -> f64 {
        self.aligned + self.additional_testing_required + self.not_in_scope + self.other
    }
}

impl AddAssign for Buckets {
    fn add_assign(&mut self, rhs: Self) {
        self.aligned += rhs.aligned;
        self.additional_testing_required += rhs.additional_testing_required;
        self.not_in_scope += rhs.not_in_scope;
        self.other += rhs.other;
        self.aligned_pass += rhs.aligned_pass;
        self.aligned_no_data += rhs.aligned_no_data;
        self.aligned_not_in_scope += rhs.aligned_not_in_scope;
    }
}

impl Sum for Buckets {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Buckets::default(), |mut acc, b| {
            acc += b;
            acc
        })
    }
}

impl<'a> Sum<&'a Buckets> for Buckets {
    fn sum<I: Iterator<Item = &'a Buckets>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Weight of each mapped code within its segment
pub fn code_weight(mapped_codes: usize) -> f64 {
    1.0 / mapped_codes.max(1) as f64
}

/// Bucket one segment's revenue share
pub fn weigh_segment(
    revenue_share: f64,
    eligibility: &[Eligibility],
    thresholds: Option<&ThresholdOutcome>,
) -> Buckets {
    let adjusted = revenue_share * code_weight(eligibility.len());
    let count = |verdict: Eligibility| eligibility.iter().filter(|v| **v == verdict).count() as f64;

    let mut buckets = Buckets {
        aligned: adjusted * count(Eligibility::No),
        additional_testing_required: adjusted * count(Eligibility::Yes),
        not_in_scope: adjusted * count(Eligibility::Na),
        ..Default::default()
    };

    if eligibility.is_empty() {
        buckets.other = adjusted;
    }

    if let Some(outcome) = thresholds {
        buckets.aligned_pass = adjusted * outcome.count(ThresholdVerdict::PassAligned) as f64;
        buckets.aligned_no_data =
            adjusted * outcome.count(ThresholdVerdict::DataNotAvailable) as f64;
        buckets.aligned_not_in_scope =
            adjusted * outcome.count(ThresholdVerdict::NotInScope) as f64;
    }

    buckets
}

/// Instrument-level alignment figures
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignmentTotals {
    pub aligned_by_industry: f64,
    pub additional_testing_required: f64,
    /// Aligned + additional testing required
    pub eligible: f64,
    pub not_in_scope: f64,
    pub others: f64,
    pub aligned_pass: f64,
    pub aligned_no_data: f64,
    pub aligned_not_in_scope: f64,
    /// Additional testing required − passed + failed threshold
    pub additional_testing_needed: f64,
    pub total: f64,
}

impl From<Buckets> for AlignmentTotals {
    fn from(b: Buckets) -> Self {
        let eligible = b.aligned + b.additional_testing_required;
        Self {
            aligned_by_industry: b.aligned,
            additional_testing_required: b.additional_testing_required,
            eligible,
            not_in_scope: b.not_in_scope,
            others: b.other,
            aligned_pass: b.aligned_pass,
            aligned_no_data: b.aligned_no_data,
            aligned_not_in_scope: b.aligned_not_in_scope,
            additional_testing_needed: b.additional_testing_required - b.aligned_pass
                + b.aligned_not_in_scope,
            total: eligible + b.not_in_scope + b.other,
        }
    }
}
