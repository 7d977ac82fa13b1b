//! Per-instrument input records
//!
//! What a market-data source hands the engine for one company: its disclosed
//! business segments, its attribute record and its controversy profile.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dnsh::ControversyProfile;

/// One disclosed business segment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentRow {
    /// Comma-delimited industry codes, or an elimination/rollup marker
    pub segment_code: String,
    pub segment_name: Option<String>,
    pub fiscal_period: Option<String>,
    pub currency: Option<String>,
    /// Segment revenue in the reporting currency, `None` if not disclosed
    pub revenue: Option<f64>,
}

impl SegmentRow {
    pub fn new(segment_code: impl Into<String>, revenue: Option<f64>) -> Self {
        Self {
            segment_code: segment_code.into(),
            revenue,
            ..Default::default()
        }
    }
}

/// Company-level attributes and reported sustainability metrics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyAttributes {
    pub name: Option<String>,
    pub esg_score: Option<f64>,
    pub sector_name: Option<String>,
    /// Parent activity code, already in the crosswalk's target scheme
    pub parent_activity_code: Option<String>,
    pub parent_activity_name: Option<String>,
    /// Metric field → reported value. A present key with `None` means the
    /// field was requested and came back null.
    pub metrics: BTreeMap<String, Option<f64>>,
}

impl CompanyAttributes {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_metric(mut self, field: impl Into<String>, value: Option<f64>) -> Self {
        self.metrics.insert(field.into(), value);
        self
    }

    pub fn with_parent_activity(mut self, code: impl Into<String>) -> Self {
        self.parent_activity_code = Some(code.into());
        self
    }

    /// Reported value for a metric field
    pub fn reported_value(&self, field: &str) -> ReportedValue {
        match self.metrics.get(field) {
            None => ReportedValue::Empty,
            Some(None) => ReportedValue::Missing,
            Some(Some(value)) => ReportedValue::Number(*value),
        }
    }
}

/// A company's reported value for one linked metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReportedValue {
    /// Field requested but reported as null
    Missing,
    /// No metric applies, or the field was never part of the attributes
    Empty,
    Number(f64),
}

impl fmt::Display for ReportedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportedValue::Missing => f.write_str("null"),
            ReportedValue::Empty => Ok(()),
            ReportedValue::Number(value) => write!(f, "{}", value),
        }
    }
}

/// Everything the engine needs about one instrument
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstrumentData {
    pub instrument: String,
    /// Raw segment table in disclosure order, rollup rows included
    pub segments: Vec<SegmentRow>,
    pub attributes: CompanyAttributes,
    pub controversies: ControversyProfile,
}

impl InstrumentData {
    pub fn new(instrument: impl Into<String>, attributes: CompanyAttributes) -> Self {
        Self {
            instrument: instrument.into(),
            attributes,
            ..Default::default()
        }
    }

    pub fn with_segment(mut self, segment: SegmentRow) -> Self {
        self.segments.push(segment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_value_states() {
        let attrs = CompanyAttributes::named("Alpha")
            .with_metric("TR.CO2", Some(7.0))
            .with_metric("TR.Water", None);

        assert_eq!(attrs.reported_value("TR.CO2"), ReportedValue::Number(7.0));
        assert_eq!(attrs.reported_value("TR.Water"), ReportedValue::Missing);
        assert_eq!(attrs.reported_value("TR.Waste"), ReportedValue::Empty);
    }

    #[test]
    fn test_reported_value_display() {
        assert_eq!(ReportedValue::Number(7.5).to_string(), "7.5");
        assert_eq!(ReportedValue::Missing.to_string(), "null");
        assert_eq!(ReportedValue::Empty.to_string(), "");
    }
}
