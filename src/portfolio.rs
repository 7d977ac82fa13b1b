//! Portfolio input and the portfolio-wide run
//!
//! Instruments are evaluated independently against one shared reference
//! store. With the `parallel` feature they run on the rayon pool; either way
//! the accumulated report follows the portfolio's input order.

use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::dnsh::{ControversyProfile, DnshAssessment};
use crate::engine::{InstrumentResult, SegmentDetailRecord, SummaryRecord, TaxonomyEngine};
use crate::error::LoadResult;
use crate::instrument::InstrumentData;
use crate::tabular::Table;

/// Column of the portfolio sheet holding instrument identifiers
pub const INSTRUMENT_COLUMN: &str = "RIC";

/// Read the instrument list from a portfolio workbook or CSV, skipping blank cells
pub fn load_portfolio(path: &Path) -> LoadResult<Vec<String>> {
    let table = Table::from_path(path)?;
    portfolio_from_table(&table)
}

fn portfolio_from_table(table: &Table) -> LoadResult<Vec<String>> {
    let column = table.column(INSTRUMENT_COLUMN)?;
    Ok(table
        .rows()
        .filter_map(|row| row.get_at(column))
        .map(str::to_string)
        .collect())
}

/// DNSH inputs and indicators for one instrument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnshRecord {
    pub instrument: String,
    pub profile: ControversyProfile,
    pub assessment: DnshAssessment,
}

/// Portfolio-wide accumulation of every instrument's output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub summaries: Vec<SummaryRecord>,
    pub segments: Vec<SegmentDetailRecord>,
    pub dnsh: Vec<DnshRecord>,
}

impl PortfolioReport {
    /// Fold one instrument's output in
    pub fn push(&mut self, result: InstrumentResult, controversies: &ControversyProfile) {
        self.dnsh.push(DnshRecord {
            instrument: result.summary.instrument.clone(),
            profile: controversies.clone(),
            assessment: DnshAssessment::assess(controversies),
        });
        self.summaries.push(result.summary);
        self.segments.extend(result.segments);
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// DNSH indicators for an instrument, if it was part of the run
    pub fn dnsh_for(&self, instrument: &str) -> Option<&DnshAssessment> {
        self.dnsh
            .iter()
            .find(|d| d.instrument == instrument)
            .map(|d| &d.assessment)
    }
}

/// Runs the engine over a whole portfolio
#[derive(Debug, Clone, Copy)]
pub struct PortfolioRunner<'a> {
    engine: TaxonomyEngine<'a>,
    parallel: bool,
}

impl<'a> PortfolioRunner<'a> {
    pub fn new(engine: TaxonomyEngine<'a>) -> Self {
        Self {
            engine,
            parallel: false,
        }
    }

    /// Evaluate instruments concurrently; ignored without the `parallel` feature
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn run(&self, inputs: &[InstrumentData]) -> PortfolioReport {
        let results = self.evaluate_all(inputs);

        let mut report = PortfolioReport::default();
        for (input, result) in inputs.iter().zip(results) {
            report.push(result, &input.controversies);
        }

        let fallbacks = report
            .summaries
            .iter()
            .filter(|s| s.alignment.is_none())
            .count();
        info!(
            instruments = report.len(),
            segments = report.segments.len(),
            fallbacks,
            "Portfolio evaluated"
        );
        report
    }

    #[cfg(feature = "parallel")]
    fn evaluate_all(&self, inputs: &[InstrumentData]) -> Vec<InstrumentResult> {
        if self.parallel {
            // indexed collect keeps input order
            inputs
                .par_iter()
                .map(|input| self.engine.evaluate(input))
                .collect()
        } else {
            inputs.iter().map(|input| self.engine.evaluate(input)).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate_all(&self, inputs: &[InstrumentData]) -> Vec<InstrumentResult> {
        inputs.iter().map(|input| self.engine.evaluate(input)).collect()
    }
}
