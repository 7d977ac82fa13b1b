//! Threshold Tester
//!
//! Activities with a technical screening metric are aligned only when the
//! company's reported value stays at or under the activity threshold.

use std::fmt;

use serde::{Serialize, Serializer};

use super::mapper::MappedCode;
use crate::instrument::{CompanyAttributes, ReportedValue};
use crate::reference::ReferenceStore;

/// Per-code result of the threshold test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdVerdict {
    /// Reported value at or below the threshold
    PassAligned,
    /// Metric linked but the company reported null
    DataNotAvailable,
    /// Reported value above the threshold
    NotInScope,
    /// No metric applies to this code
    NotApplicable,
}

impl ThresholdVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdVerdict::PassAligned => "Pass - Aligned",
            ThresholdVerdict::DataNotAvailable => "Data not available",
            ThresholdVerdict::NotInScope => "Not in Scope",
            ThresholdVerdict::NotApplicable => "",
        }
    }
}

impl fmt::Display for ThresholdVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ThresholdVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Threshold results for one segment, all lists parallel to the mapped codes
/// except `metric_fields`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdOutcome {
    /// Linked metric name per code, blank where none is linked
    pub metric_names: Vec<String>,
    /// Distinct linked metric fields in first-seen order
    pub metric_fields: Vec<String>,
    pub reported_values: Vec<ReportedValue>,
    pub verdicts: Vec<ThresholdVerdict>,
}

impl ThresholdOutcome {
    pub fn count(&self, verdict: ThresholdVerdict) -> usize {
        self.verdicts.iter().filter(|v| **v == verdict).count()
    }
}

/// Run the threshold test for a segment's mapped codes
///
/// Returns `None` when no code carries a metric linkage.
pub fn screen(
    codes: &[MappedCode],
    attributes: &CompanyAttributes,
    store: &ReferenceStore,
) -> Option<ThresholdOutcome> {
    let linkages: Vec<_> = codes
        .iter()
        .map(|code| code.target().and_then(|target| store.metric(target)))
        .collect();

    let mut metric_fields: Vec<String> = Vec::new();
    for metric in linkages.iter().flatten() {
        if !metric_fields.contains(&metric.metric_field) {
            metric_fields.push(metric.metric_field.clone());
        }
    }
    if metric_fields.is_empty() {
        return None;
    }

    let metric_names = linkages
        .iter()
        .map(|metric| metric.map(|m| m.metric_name.clone()).unwrap_or_default())
        .collect();

    let reported_values: Vec<ReportedValue> = linkages
        .iter()
        .map(|metric| match metric {
            Some(m) => attributes.reported_value(&m.metric_field),
            None => ReportedValue::Empty,
        })
        .collect();

    let verdicts = reported_values
        .iter()
        .zip(&linkages)
        .map(|(value, metric)| classify(*value, metric.map(|m| m.threshold)))
        .collect();

    Some(ThresholdOutcome {
        metric_names,
        metric_fields,
        reported_values,
        verdicts,
    })
}

/// Compare a reported value with a threshold; equality passes
///
/// A reported `0` is a measurement like any other and is compared against
/// the threshold. It is never read as "no value", so it cannot produce a
/// blank verdict.
pub fn classify(value: ReportedValue, threshold: Option<f64>) -> ThresholdVerdict {
    match (value, threshold) {
        (ReportedValue::Missing, _) => ThresholdVerdict::DataNotAvailable,
        (ReportedValue::Empty, _) | (ReportedValue::Number(_), None) => {
            ThresholdVerdict::NotApplicable
        }
        (ReportedValue::Number(v), Some(limit)) if v > limit => ThresholdVerdict::NotInScope,
        (ReportedValue::Number(_), Some(_)) => ThresholdVerdict::PassAligned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::MetricThresholdRow;

    fn store() -> ReferenceStore {
        ReferenceStore::new(
            vec![],
            vec![],
            vec![
                MetricThresholdRow {
                    target_code: "X1".to_string(),
                    metric_name: "CO2 intensity".to_string(),
                    metric_field: "TR.CO2".to_string(),
                    threshold: 5.0,
                },
                MetricThresholdRow {
                    target_code: "X2".to_string(),
                    metric_name: "CO2 intensity".to_string(),
                    metric_field: "TR.CO2".to_string(),
                    threshold: 10.0,
                },
                MetricThresholdRow {
                    target_code: "X3".to_string(),
                    metric_name: "Water use".to_string(),
                    metric_field: "TR.Water".to_string(),
                    threshold: 1.0,
                },
            ],
        )
    }

    fn code(target: &str) -> MappedCode {
        MappedCode::Target(target.to_string())
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(ReportedValue::Number(7.0), Some(5.0)),
            ThresholdVerdict::NotInScope
        );
        assert_eq!(
            classify(ReportedValue::Number(5.0), Some(5.0)),
            ThresholdVerdict::PassAligned
        );
        assert_eq!(
            classify(ReportedValue::Number(0.0), Some(5.0)),
            ThresholdVerdict::PassAligned
        );
        assert_eq!(
            classify(ReportedValue::Missing, Some(5.0)),
            ThresholdVerdict::DataNotAvailable
        );
        assert_eq!(
            classify(ReportedValue::Empty, Some(5.0)),
            ThresholdVerdict::NotApplicable
        );
    }

    #[test]
    fn test_no_linkage_yields_none() {
        let attrs = CompanyAttributes::default();
        assert!(screen(&[code("X9"), MappedCode::Unmapped], &attrs, &store()).is_none());
        assert!(screen(&[], &attrs, &store()).is_none());
    }

    #[test]
    fn test_zero_reported_value_is_compared() {
        assert_eq!(
            classify(ReportedValue::Number(0.0), Some(0.0)),
            ThresholdVerdict::PassAligned
        );
        assert_eq!(
            classify(ReportedValue::Number(0.0), Some(-1.0)),
            ThresholdVerdict::NotInScope
        );
        assert_eq!(
            classify(ReportedValue::Number(0.0), None),
            ThresholdVerdict::NotApplicable
        );
    }

    #[test]
    fn test_same_field_is_reported_once() {
        let attrs = CompanyAttributes::default().with_metric("TR.CO2", Some(7.0));
        let outcome = screen(&[code("X1"), code("X2"), code("X9")], &attrs, &store()).unwrap();

        assert_eq!(outcome.metric_fields, vec!["TR.CO2".to_string()]);
        assert_eq!(
            outcome.metric_names,
            vec!["CO2 intensity".to_string(), "CO2 intensity".to_string(), String::new()]
        );
        // each code is tested against its own threshold
        assert_eq!(
            outcome.verdicts,
            vec![
                ThresholdVerdict::NotInScope,
                ThresholdVerdict::PassAligned,
                ThresholdVerdict::NotApplicable
            ]
        );
        assert_eq!(outcome.count(ThresholdVerdict::NotInScope), 1);
    }

    #[test]
    fn test_absent_field_is_empty_not_missing() {
        let attrs = CompanyAttributes::default().with_metric("TR.CO2", None);
        let outcome = screen(&[code("X1"), code("X3")], &attrs, &store()).unwrap();

        assert_eq!(
            outcome.reported_values,
            vec![ReportedValue::Missing, ReportedValue::Empty]
        );
        assert_eq!(
            outcome.verdicts,
            vec![
                ThresholdVerdict::DataNotAvailable,
                ThresholdVerdict::NotApplicable
            ]
        );
        assert_eq!(
            outcome.metric_fields,
            vec!["TR.CO2".to_string(), "TR.Water".to_string()]
        );
    }
}
