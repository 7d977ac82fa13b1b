//! Reference table loading
//!
//! Each table is a CSV export of one sheet of the reference workbook, keeping
//! the workbook's column headers:
//!
//! | file              | columns                                                                        |
//! |-------------------|--------------------------------------------------------------------------------|
//! | `crosswalk.csv`   | `NAICS Code`, `TRBC Hierarchical Code`                                         |
//! | `eligibility.csv` | `TRBC code`, `Additional testing needed?`                                      |
//! | `metrics.csv`     | `TRBC Activity`, `Refinitiv ESG Data Measures`, `Refinitiv ESG Field`, `Used for testing` |
//!
//! Rows with a blank key are skipped with a warning; the table itself is not
//! checked for completeness.

use std::path::Path;

use tracing::{info, warn};

use super::{
    normalize_code, CrosswalkRow, Eligibility, EligibilityRow, MetricThresholdRow, ReferenceStore,
};
use crate::error::{LoadError, LoadResult};
use crate::tabular::Table;

pub const CROSSWALK_FILE: &str = "crosswalk.csv";
pub const ELIGIBILITY_FILE: &str = "eligibility.csv";
pub const METRICS_FILE: &str = "metrics.csv";

const COL_SOURCE_CODE: &str = "NAICS Code";
const COL_TARGET_CODE: &str = "TRBC Hierarchical Code";
const COL_ELIGIBLE_CODE: &str = "TRBC code";
const COL_ELIGIBILITY: &str = "Additional testing needed?";
const COL_METRIC_CODE: &str = "TRBC Activity";
const COL_METRIC_NAME: &str = "Refinitiv ESG Data Measures";
const COL_METRIC_FIELD: &str = "Refinitiv ESG Field";
const COL_THRESHOLD: &str = "Used for testing";

/// Load all three tables from a directory and build the store
pub fn load_reference_dir(dir: &Path) -> LoadResult<ReferenceStore> {
    let crosswalk = load_crosswalk(&dir.join(CROSSWALK_FILE))?;
    let eligibility = load_eligibility(&dir.join(ELIGIBILITY_FILE))?;
    let metrics = load_metrics(&dir.join(METRICS_FILE))?;

    let store = ReferenceStore::new(crosswalk, eligibility, metrics);
    info!(
        crosswalk = store.crosswalk_len(),
        eligibility = store.eligibility_len(),
        metrics = store.metrics_len(),
        "Reference tables loaded from {}",
        dir.display()
    );
    Ok(store)
}

pub fn load_crosswalk(path: &Path) -> LoadResult<Vec<CrosswalkRow>> {
    parse_crosswalk(&Table::from_path(path)?)
}

pub fn load_eligibility(path: &Path) -> LoadResult<Vec<EligibilityRow>> {
    parse_eligibility(&Table::from_path(path)?)
}

pub fn load_metrics(path: &Path) -> LoadResult<Vec<MetricThresholdRow>> {
    parse_metrics(&Table::from_path(path)?)
}

fn parse_crosswalk(table: &Table) -> LoadResult<Vec<CrosswalkRow>> {
    table.column(COL_SOURCE_CODE)?;
    table.column(COL_TARGET_CODE)?;

    let mut rows = Vec::with_capacity(table.len());
    for row in table.rows() {
        let (Some(source), Some(target)) = (row.get(COL_SOURCE_CODE), row.get(COL_TARGET_CODE))
        else {
            warn!("Skipping crosswalk row {}: blank code", row.line());
            continue;
        };

        let source_code = normalize_code(source).parse::<u64>().map_err(|_| {
            LoadError::InvalidValue {
                column: COL_SOURCE_CODE.to_string(),
                value: source.to_string(),
                row: row.line(),
            }
        })?;

        rows.push(CrosswalkRow {
            source_code,
            target_code: normalize_code(target),
        });
    }
    Ok(rows)
}

fn parse_eligibility(table: &Table) -> LoadResult<Vec<EligibilityRow>> {
    table.column(COL_ELIGIBLE_CODE)?;
    table.column(COL_ELIGIBILITY)?;

    let mut rows = Vec::with_capacity(table.len());
    for row in table.rows() {
        let Some(code) = row.get(COL_ELIGIBLE_CODE) else {
            warn!("Skipping eligibility row {}: blank code", row.line());
            continue;
        };
        let raw = row.get(COL_ELIGIBILITY).unwrap_or_default();
        let eligibility =
            raw.parse::<Eligibility>()
                .map_err(|_| LoadError::InvalidValue {
                    column: COL_ELIGIBILITY.to_string(),
                    value: raw.to_string(),
                    row: row.line(),
                })?;

        rows.push(EligibilityRow {
            target_code: normalize_code(code),
            eligibility,
        });
    }
    Ok(rows)
}

fn parse_metrics(table: &Table) -> LoadResult<Vec<MetricThresholdRow>> {
    for column in [COL_METRIC_CODE, COL_METRIC_NAME, COL_METRIC_FIELD, COL_THRESHOLD] {
        table.column(column)?;
    }

    let mut rows = Vec::with_capacity(table.len());
    for row in table.rows() {
        let Some(code) = row.get(COL_METRIC_CODE) else {
            warn!("Skipping metric row {}: blank activity code", row.line());
            continue;
        };
        let Some(threshold) = row.number(COL_THRESHOLD)? else {
            warn!("Skipping metric row {}: no threshold for {}", row.line(), code);
            continue;
        };

        rows.push(MetricThresholdRow {
            target_code: normalize_code(code),
            metric_name: row.get(COL_METRIC_NAME).unwrap_or_default().to_string(),
            metric_field: row.get(COL_METRIC_FIELD).unwrap_or_default().to_string(),
            threshold,
        });
    }
    Ok(rows)
}
