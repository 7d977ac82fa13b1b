//! Shared fixtures for the integration tests
//!
//! A small in-memory reference store and builders for instrument inputs, plus
//! the path of the sample data set shipped under `data/`.

#![allow(dead_code)]

use std::path::PathBuf;

use taxo_align::instrument::{CompanyAttributes, InstrumentData, SegmentRow};
use taxo_align::reference::{CrosswalkRow, Eligibility, EligibilityRow, MetricThresholdRow};
use taxo_align::ReferenceStore;

pub const CO2_FIELD: &str = "TR.CO2";

/// Crosswalk 541990 -> X1 (No), 221100 -> X2 (Yes, CO2 <= 5), 221114 -> X3 (Yes)
pub fn reference_store() -> ReferenceStore {
    ReferenceStore::new(
        vec![
            crosswalk(541990, "X1"),
            crosswalk(221100, "X2"),
            crosswalk(221114, "X3"),
        ],
        vec![
            eligibility("X1", Eligibility::No),
            eligibility("X2", Eligibility::Yes),
            eligibility("X3", Eligibility::Yes),
            eligibility("5010101010", Eligibility::Yes),
        ],
        vec![MetricThresholdRow {
            target_code: "X2".to_string(),
            metric_name: "CO2 intensity".to_string(),
            metric_field: CO2_FIELD.to_string(),
            threshold: 5.0,
        }],
    )
}

fn crosswalk(source_code: u64, target_code: &str) -> CrosswalkRow {
    CrosswalkRow {
        source_code,
        target_code: target_code.to_string(),
    }
}

fn eligibility(target_code: &str, eligibility: Eligibility) -> EligibilityRow {
    EligibilityRow {
        target_code: target_code.to_string(),
        eligibility,
    }
}

/// Instrument with the given `(segment code, revenue)` rows
pub fn instrument(id: &str, segments: &[(&str, Option<f64>)]) -> InstrumentData {
    instrument_with(id, CompanyAttributes::named(format!("{} Corp", id)), segments)
}

pub fn instrument_with(
    id: &str,
    attributes: CompanyAttributes,
    segments: &[(&str, Option<f64>)],
) -> InstrumentData {
    segments
        .iter()
        .fold(InstrumentData::new(id, attributes), |data, (code, revenue)| {
            data.with_segment(SegmentRow::new(*code, *revenue))
        })
}

/// Directory holding the bundled sample data set
pub fn sample_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
