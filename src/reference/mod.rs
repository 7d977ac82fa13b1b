//! Reference Store
//!
//! The three static lookup tables every instrument is evaluated against:
//!
//! ```text
//! IndustryCrosswalk     source code (NAICS) ──► target code (TRBC)
//! EligibilityTable      target code ──► Yes | No | na
//! MetricThresholdTable  target code ──► (metric name, metric field, threshold)
//! ```
//!
//! The store is built once and never mutated afterwards, so a shared
//! reference can be handed to any number of concurrent computations. All
//! lookups are single-row and resolve duplicates by keeping the first row.

mod loader;

pub use loader::{load_crosswalk, load_eligibility, load_metrics, load_reference_dir};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Company attribute fields always requested alongside the metric fields
pub const COMPANY_ATTRIBUTE_FIELDS: [&str; 5] = [
    "TR.CommonName",
    "TR.TRESGScore",
    "TR.TRBCActivityCode",
    "TR.TRBCEconomicSector",
    "TR.TRBCActivity",
];

/// Taxonomy eligibility of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eligibility {
    /// Eligible, further testing needed
    Yes,
    /// Eligible, no further testing needed
    No,
    /// Not in scope
    #[serde(rename = "na")]
    Na,
}

impl Eligibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Yes => "Yes",
            Eligibility::No => "No",
            Eligibility::Na => "na",
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Eligibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(Eligibility::Yes),
            "no" | "n" => Ok(Eligibility::No),
            "na" | "n/a" => Ok(Eligibility::Na),
            other => Err(format!("unknown eligibility value '{}'", other)),
        }
    }
}

/// Crosswalk row: one source-scheme code and its target-scheme code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosswalkRow {
    pub source_code: u64,
    pub target_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRow {
    pub target_code: String,
    pub eligibility: Eligibility,
}

/// Sustainability metric linked to an activity, with its alignment threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholdRow {
    pub target_code: String,
    /// Human readable metric name
    pub metric_name: String,
    /// Field name the company attributes carry the value under
    pub metric_field: String,
    pub threshold: f64,
}

/// Immutable bundle of the three reference tables
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    crosswalk: HashMap<u64, String>,
    eligibility: HashMap<String, Eligibility>,
    metrics: HashMap<String, MetricThresholdRow>,
    metric_fields: Vec<String>,
}

impl ReferenceStore {
    pub fn new(
        crosswalk: Vec<CrosswalkRow>,
        eligibility: Vec<EligibilityRow>,
        metrics: Vec<MetricThresholdRow>,
    ) -> Self {
        let mut store = Self::default();

        for row in crosswalk {
            store
                .crosswalk
                .entry(row.source_code)
                .or_insert_with(|| normalize_code(&row.target_code));
        }

        for row in eligibility {
            store
                .eligibility
                .entry(normalize_code(&row.target_code))
                .or_insert(row.eligibility);
        }

        for row in metrics {
            if !row.metric_field.is_empty() && !store.metric_fields.contains(&row.metric_field) {
                store.metric_fields.push(row.metric_field.clone());
            }
            store
                .metrics
                .entry(normalize_code(&row.target_code))
                .or_insert(row);
        }
        store.metric_fields.sort();

        store
    }

    /// Target-scheme code for a source-scheme code
    pub fn target_code(&self, source_code: u64) -> Option<&str> {
        self.crosswalk.get(&source_code).map(String::as_str)
    }

    /// Eligibility of a target-scheme code, `None` if the table has no row
    pub fn eligibility(&self, target_code: &str) -> Option<Eligibility> {
        self.eligibility.get(&normalize_code(target_code)).copied()
    }

    /// Metric linkage of a target-scheme code
    pub fn metric(&self, target_code: &str) -> Option<&MetricThresholdRow> {
        self.metrics.get(&normalize_code(target_code))
    }

    /// Distinct metric fields referenced by the threshold table, sorted
    pub fn metric_fields(&self) -> &[String] {
        &self.metric_fields
    }

    /// Every attribute field a market-data request must ask for
    pub fn requested_fields(&self) -> Vec<String> {
        let mut fields = self.metric_fields.clone();
        fields.extend(COMPANY_ATTRIBUTE_FIELDS.iter().map(|f| f.to_string()));
        fields
    }

    pub fn crosswalk_len(&self) -> usize {
        self.crosswalk.len()
    }

    pub fn eligibility_len(&self) -> usize {
        self.eligibility.len()
    }

    pub fn metrics_len(&self) -> usize {
        self.metrics.len()
    }
}

/// Canonical text form of a code read from a spreadsheet export
///
/// Trims whitespace and drops a trailing `.0` left behind when an integer
/// column passed through a float.
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(".0") {
        Some(head) if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) => {
            head.to_string()
        }
        _ => trimmed.to_string(),
    }
}
