//! Taxo Align - EU climate taxonomy alignment engine
//!
//! Estimates what share of each portfolio company's revenue is eligible for
//! and aligned with the EU climate taxonomy. Segment-level revenue disclosures
//! are translated from their industry classification into the taxonomy's
//! activity scheme, classified, screened against technical thresholds and
//! aggregated into per-company figures.
//!
//! ## Flow
//! Reference tables -> `ReferenceStore`
//! Portfolio -> `MarketDataSource::fetch` -> `TaxonomyEngine::evaluate` per instrument
//! -> `PortfolioReport` -> `ReportWriter`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use taxo_align::{load_reference_dir, EngineConfig, TaxonomyEngine};
//! use taxo_align::instrument::{CompanyAttributes, InstrumentData, SegmentRow};
//!
//! let store = load_reference_dir(Path::new("data/reference")).unwrap();
//! let config = EngineConfig::default();
//! let engine = TaxonomyEngine::new(&store, &config);
//!
//! let input = InstrumentData::new("ABC.L", CompanyAttributes::named("Alpha"))
//!     .with_segment(SegmentRow::new("541990", Some(120.0)));
//! let result = engine.evaluate(&input);
//! println!("{:?}", result.summary.alignment);
//! ```

// Core error handling
pub mod error;

pub mod config;
pub mod tabular;

// Reference tables and per-instrument inputs
pub mod dnsh;
pub mod instrument;
pub mod reference;

// Alignment computation
pub mod engine;

// Collaborators around the engine
pub mod market_data;
pub mod portfolio;
pub mod report;

pub use config::{AppConfig, EngineConfig, ReportFormat};
pub use engine::{InstrumentResult, SegmentDetailRecord, SummaryRecord, TaxonomyEngine};
pub use error::{LoadError, MarketDataError, ReportError, TaxoError, TaxoResult};
pub use market_data::{Credential, MarketDataSource, SnapshotSource};
pub use portfolio::{load_portfolio, PortfolioReport, PortfolioRunner};
pub use reference::{load_reference_dir, Eligibility, ReferenceStore};
pub use report::ReportWriter;
