//! Segment Normalizer
//!
//! Drops elimination and rollup rows and turns the remaining segment revenues
//! into shares of the retained total.

use crate::config::EngineConfig;
use crate::instrument::SegmentRow;

/// A retained segment with its share of retained revenue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetainedSegment<'a> {
    pub row: &'a SegmentRow,
    pub revenue_share: f64,
}

/// Why segment-level analysis was abandoned for an instrument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoSegmentData {
    /// The feed returned no rows, or the revenue field is blank
    NoRevenueField,
    /// Retained revenue is under the materiality floor
    BelowMaterialityFloor { total: f64 },
}

/// Outcome of normalizing one instrument's segment table
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedSegments<'a> {
    Usable(Vec<RetainedSegment<'a>>),
    Unusable(NoSegmentData),
}

/// Filter and share out a raw segment table
///
/// The floor is exclusive: a total exactly equal to it is usable.
pub fn normalize<'a>(rows: &'a [SegmentRow], config: &EngineConfig) -> NormalizedSegments<'a> {
    match rows.first() {
        Some(first) if first.revenue.is_some() => {}
        _ => return NormalizedSegments::Unusable(NoSegmentData::NoRevenueField),
    }

    let retained: Vec<&SegmentRow> = rows
        .iter()
        .filter(|row| !config.is_excluded_segment(&row.segment_code))
        .collect();
    let total: f64 = retained.iter().filter_map(|row| row.revenue).sum();

    // a non-positive total can only be reached with a floor <= 0
    if total < config.materiality_floor || total <= 0.0 || retained.is_empty() {
        return NormalizedSegments::Unusable(NoSegmentData::BelowMaterialityFloor { total });
    }

    NormalizedSegments::Usable(
        retained
            .into_iter()
            .map(|row| RetainedSegment {
                row,
                revenue_share: row.revenue.unwrap_or(0.0) / total,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shares(result: &NormalizedSegments<'_>) -> Vec<f64> {
        match result {
            NormalizedSegments::Usable(segments) => {
                segments.iter().map(|s| s.revenue_share).collect()
            }
            NormalizedSegments::Unusable(reason) => panic!("unexpected fallback: {:?}", reason),
        }
    }

    #[test]
    fn test_excluded_rows_are_dropped() {
        let rows = vec![
            SegmentRow::new("541990", Some(60.0)),
            SegmentRow::new("221100", Some(40.0)),
            SegmentRow::new("ICELIM", Some(-5.0)),
            SegmentRow::new("SEGMTL", Some(95.0)),
        ];
        let result = normalize(&rows, &EngineConfig::default());
        assert_eq!(shares(&result), vec![0.6, 0.4]);
    }

    #[test]
    fn test_shares_sum_to_one() {
        let rows = vec![
            SegmentRow::new("1", Some(13.0)),
            SegmentRow::new("2", Some(29.0)),
            SegmentRow::new("3", Some(71.0)),
        ];
        let result = normalize(&rows, &EngineConfig::default());
        let total: f64 = shares(&result).iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_blank_revenue_field_falls_back() {
        let rows = vec![SegmentRow::new("541990", None)];
        assert_eq!(
            normalize(&rows, &EngineConfig::default()),
            NormalizedSegments::Unusable(NoSegmentData::NoRevenueField)
        );
        assert_eq!(
            normalize(&[], &EngineConfig::default()),
            NormalizedSegments::Unusable(NoSegmentData::NoRevenueField)
        );
    }

    #[test]
    fn test_materiality_floor_is_exclusive() {
        let config = EngineConfig::default();

        let at_floor = vec![SegmentRow::new("541990", Some(10.0))];
        assert_eq!(shares(&normalize(&at_floor, &config)), vec![1.0]);

        let below = vec![
            SegmentRow::new("541990", Some(4.0)),
            SegmentRow::new("221100", Some(1.0)),
        ];
        assert_eq!(
            normalize(&below, &config),
            NormalizedSegments::Unusable(NoSegmentData::BelowMaterialityFloor { total: 5.0 })
        );
    }

    #[test]
    fn test_rollups_do_not_count_towards_floor() {
        let rows = vec![
            SegmentRow::new("541990", Some(5.0)),
            SegmentRow::new("CONSTL", Some(500.0)),
        ];
        assert!(matches!(
            normalize(&rows, &EngineConfig::default()),
            NormalizedSegments::Unusable(NoSegmentData::BelowMaterialityFloor { .. })
        ));
    }

    #[test]
    fn test_blank_revenue_in_later_row_counts_as_zero() {
        let rows = vec![
            SegmentRow::new("541990", Some(20.0)),
            SegmentRow::new("221100", None),
        ];
        let result = normalize(&rows, &EngineConfig::default());
        assert_eq!(shares(&result), vec![1.0, 0.0]);
    }
}
