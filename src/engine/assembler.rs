//! Result Assembler
//!
//! Fixed-shape output records for one instrument: a summary row and the
//! annotated segment rows.

use serde::Serialize;

use super::aggregator::{AlignmentTotals, Buckets};
use super::fallback::ParentAssessment;
use super::mapper::MappedCode;
use super::threshold::ThresholdOutcome;
use crate::instrument::{CompanyAttributes, SegmentRow};
use crate::reference::Eligibility;

/// Status annotation carried by every segment detail row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowStatus {
    Listed,
    Delisted,
    NoData,
    DelistedNoData,
}

impl RowStatus {
    pub fn new(delisted: bool, has_segment_data: bool) -> Self {
        match (delisted, has_segment_data) {
            (false, true) => RowStatus::Listed,
            (true, true) => RowStatus::Delisted,
            (false, false) => RowStatus::NoData,
            (true, false) => RowStatus::DelistedNoData,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Listed => "",
            RowStatus::Delisted => "Delisted",
            RowStatus::NoData => "No Data",
            RowStatus::DelistedNoData => "Delisted, No Data",
        }
    }
}

/// Per-instrument summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub instrument: String,
    pub name: Option<String>,
    pub delisted: bool,
    pub esg_score: Option<f64>,
    pub economic_sector: Option<String>,
    pub activity_name: Option<String>,
    /// Segment-level figures; `None` when the fallback path ran
    pub alignment: Option<AlignmentTotals>,
    /// Parent activity verdict; `None` when segment data was usable
    pub parent: Option<ParentAssessment>,
}

impl SummaryRecord {
    fn identity(instrument: &str, attributes: &CompanyAttributes, delisted: bool) -> Self {
        Self {
            instrument: instrument.to_string(),
            name: attributes.name.clone(),
            delisted,
            esg_score: attributes.esg_score,
            economic_sector: attributes.sector_name.clone(),
            activity_name: attributes.parent_activity_name.clone(),
            alignment: None,
            parent: None,
        }
    }

    pub fn parent_eligible(&self) -> Option<String> {
        self.parent.and_then(|p| p.parent_eligible())
    }

    pub fn parent_eligible_ratio(&self) -> Option<f64> {
        self.parent.and_then(|p| p.eligible_ratio())
    }

    pub fn parent_not_in_scope_ratio(&self) -> Option<f64> {
        self.parent.and_then(|p| p.not_in_scope_ratio())
    }
}

/// Everything derived for one retained segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentAnalysis {
    pub revenue_share: f64,
    pub mapped_codes: Vec<MappedCode>,
    pub eligibility: Vec<Eligibility>,
    pub threshold: Option<ThresholdOutcome>,
    pub code_weight: f64,
    pub buckets: Buckets,
}

impl SegmentAnalysis {
    /// Linked metric names per code, `None` unless at least one is linked
    pub fn linked_metric_names(&self) -> Option<&[String]> {
        self.threshold
            .as_ref()
            .map(|t| t.metric_names.as_slice())
            .filter(|names| names.iter().any(|n| !n.is_empty()))
    }
}

/// One row of the segment detail table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentDetailRecord {
    pub instrument: String,
    pub name: Option<String>,
    pub status: RowStatus,
    pub segment: SegmentRow,
    /// `None` for fallback placeholders
    pub analysis: Option<SegmentAnalysis>,
}

/// Output of one instrument computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentResult {
    pub summary: SummaryRecord,
    pub segments: Vec<SegmentDetailRecord>,
}

/// Shape the result of the segment path
pub fn assemble_analysed(
    instrument: &str,
    attributes: &CompanyAttributes,
    delisted: bool,
    analysed: Vec<(&SegmentRow, SegmentAnalysis)>,
) -> InstrumentResult {
    let mut summary = SummaryRecord::identity(instrument, attributes, delisted);
    let totals: Buckets = analysed.iter().map(|(_, a)| a.buckets).sum();
    summary.alignment = Some(AlignmentTotals::from(totals));

    let status = RowStatus::new(delisted, true);
    let segments = analysed
        .into_iter()
        .map(|(row, analysis)| SegmentDetailRecord {
            instrument: instrument.to_string(),
            name: attributes.name.clone(),
            status,
            segment: row.clone(),
            analysis: Some(analysis),
        })
        .collect();

    InstrumentResult { summary, segments }
}

/// Shape the result of the fallback path
///
/// The raw rows are passed through unanalysed; a company the feed returned no
/// rows for still gets one placeholder row so it shows up in the detail table.
pub fn assemble_fallback(
    instrument: &str,
    attributes: &CompanyAttributes,
    delisted: bool,
    raw_rows: &[SegmentRow],
    parent: ParentAssessment,
) -> InstrumentResult {
    let mut summary = SummaryRecord::identity(instrument, attributes, delisted);
    summary.parent = Some(parent);

    let status = RowStatus::new(delisted, false);
    let placeholder = [SegmentRow::default()];
    let rows = if raw_rows.is_empty() {
        &placeholder[..]
    } else {
        raw_rows
    };

    let segments = rows
        .iter()
        .map(|row| SegmentDetailRecord {
            instrument: instrument.to_string(),
            name: attributes.name.clone(),
            status,
            segment: row.clone(),
            analysis: None,
        })
        .collect();

    InstrumentResult { summary, segments }
}
