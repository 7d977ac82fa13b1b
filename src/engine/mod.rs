//! Taxonomy Alignment Computation Engine
//!
//! Per-instrument pipeline:
//!
//! ```text
//! raw segments ─► normalize ─┬─► usable ─► per segment: map ─► classify ─► screen ─► weigh
//!                            │                                                        │
//!                            │                                   sum buckets ◄────────┘
//!                            │                                        │
//!                            └─► unusable ─► assess parent ───────────┴─► assemble
//! ```
//!
//! The engine holds only shared references to the reference store and the
//! configuration. Each call to [`TaxonomyEngine::evaluate`] builds its derived
//! state from scratch, so one engine can serve many threads at once.

pub mod aggregator;
pub mod assembler;
pub mod eligibility;
pub mod fallback;
pub mod mapper;
pub mod normalizer;
pub mod threshold;

pub use aggregator::{code_weight, weigh_segment, AlignmentTotals, Buckets};
pub use assembler::{
    InstrumentResult, RowStatus, SegmentAnalysis, SegmentDetailRecord, SummaryRecord,
};
pub use fallback::{assess_parent, ParentAssessment};
pub use mapper::{map_codes, pad_code, MappedCode, UNMAPPED_MARKER};
pub use normalizer::{normalize, NoSegmentData, NormalizedSegments, RetainedSegment};
pub use threshold::{ThresholdOutcome, ThresholdVerdict};

use tracing::debug;

use crate::config::EngineConfig;
use crate::instrument::{CompanyAttributes, InstrumentData, SegmentRow};
use crate::reference::ReferenceStore;

#[derive(Debug, Clone, Copy)]
pub struct TaxonomyEngine<'a> {
    store: &'a ReferenceStore,
    config: &'a EngineConfig,
}

impl<'a> TaxonomyEngine<'a> {
    pub fn new(store: &'a ReferenceStore, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    /// Compute the summary and detail rows for one instrument
    pub fn evaluate(&self, input: &InstrumentData) -> InstrumentResult {
        self.evaluate_parts(&input.instrument, &input.segments, &input.attributes)
    }

    pub fn evaluate_parts(
        &self,
        instrument: &str,
        segments: &[SegmentRow],
        attributes: &CompanyAttributes,
    ) -> InstrumentResult {
        let delisted = self.config.is_delisted(instrument);

        match normalize(segments, self.config) {
            NormalizedSegments::Usable(retained) => {
                let analysed = retained
                    .into_iter()
                    .map(|segment| (segment.row, self.analyse_segment(segment, attributes)))
                    .collect();
                assembler::assemble_analysed(instrument, attributes, delisted, analysed)
            }
            NormalizedSegments::Unusable(reason) => {
                let parent = assess_parent(attributes, self.store);
                debug!(
                    instrument,
                    ?reason,
                    parent = %parent,
                    "No usable segment data, assessed parent activity"
                );
                assembler::assemble_fallback(instrument, attributes, delisted, segments, parent)
            }
        }
    }

    /// Run mapping, classification, threshold screening and weighting for a
    /// single retained segment
    pub fn analyse_segment(
        &self,
        segment: RetainedSegment<'_>,
        attributes: &CompanyAttributes,
    ) -> SegmentAnalysis {
        let mapped_codes = map_codes(&segment.row.segment_code, self.store, self.config.code_width);
        let eligibility = eligibility::classify(&mapped_codes, self.store);
        let threshold = threshold::screen(&mapped_codes, attributes, self.store);
        let buckets = weigh_segment(segment.revenue_share, &eligibility, threshold.as_ref());

        debug!(
            segment = %segment.row.segment_code,
            share = segment.revenue_share,
            codes = mapped_codes.len(),
            "Segment analysed"
        );

        SegmentAnalysis {
            revenue_share: segment.revenue_share,
            code_weight: code_weight(mapped_codes.len()),
            mapped_codes,
            eligibility,
            threshold,
            buckets,
        }
    }
}
