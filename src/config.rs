//! Runtime configuration
//!
//! Loaded from YAML. Every field has a default, so an empty document (or no
//! file at all) yields the standard engine behaviour.
//!
//! ```yaml
//! engine:
//!   materiality_floor: 10.0
//!   excluded_segment_markers: [SEGMTL, ICELIM, EXPOTH, CONSTL]
//!   delisting_marker: "^"
//!   code_width: 6
//! reference_dir: data/reference
//! market_data_dir: data/market
//! parallel: true
//! report_format: xlsx
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};

/// Knobs for the per-instrument computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Retained revenue strictly below this routes to the parent fallback
    pub materiality_floor: f64,
    /// Segment code prefixes for eliminations and rollups
    pub excluded_segment_markers: Vec<String>,
    /// Character in an instrument id that marks it as delisted
    pub delisting_marker: char,
    /// Width numeric industry codes are right-padded to before lookup
    pub code_width: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            materiality_floor: 10.0,
            excluded_segment_markers: ["SEGMTL", "ICELIM", "EXPOTH", "CONSTL"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            delisting_marker: '^',
            code_width: 6,
        }
    }
}

impl EngineConfig {
    /// True if the segment code denotes an elimination or rollup row
    pub fn is_excluded_segment(&self, segment_code: &str) -> bool {
        self.excluded_segment_markers
            .iter()
            .any(|marker| segment_code.starts_with(marker.as_str()))
    }

    pub fn is_delisted(&self, instrument: &str) -> bool {
        instrument.contains(self.delisting_marker)
    }
}

/// Output flavour for the report writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// One workbook with a named worksheet per sheet
    #[default]
    Xlsx,
    /// One CSV file per sheet
    Csv,
    /// A single JSON document holding every sheet
    Json,
}

/// Application configuration for the report CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    /// Directory holding crosswalk.csv, eligibility.csv and metrics.csv
    pub reference_dir: PathBuf,
    /// Directory holding the market-data snapshot files
    pub market_data_dir: PathBuf,
    /// Evaluate instruments on the rayon pool
    pub parallel: bool,
    pub report_format: ReportFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            reference_dir: PathBuf::from("data/reference"),
            market_data_dir: PathBuf::from("data/market"),
            parallel: true,
            report_format: ReportFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load from a YAML file
    pub fn load_from_file(path: &Path) -> LoadResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        Self::load_from_str(&content)
    }

    /// Load from a YAML string
    pub fn load_from_str(yaml: &str) -> LoadResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.materiality_floor, 10.0);
        assert_eq!(config.code_width, 6);
        assert!(config.is_excluded_segment("SEGMTL"));
        assert!(config.is_excluded_segment("ICELIM01"));
        assert!(!config.is_excluded_segment("541990"));
        assert!(!config.is_excluded_segment("541990,SEGMTL"));
    }

    #[test]
    fn test_delisting_marker() {
        let config = EngineConfig::default();
        assert!(config.is_delisted("ABC.L^K21"));
        assert!(!config.is_delisted("ABC.L"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
engine:
  materiality_floor: 25.0
parallel: false
report_format: json
"#;
        let config = AppConfig::load_from_str(yaml).unwrap();
        assert_eq!(config.engine.materiality_floor, 25.0);
        assert_eq!(config.engine.delisting_marker, '^');
        assert_eq!(config.engine.excluded_segment_markers.len(), 4);
        assert!(!config.parallel);
        assert_eq!(config.report_format, ReportFormat::Json);
        assert_eq!(config.reference_dir, PathBuf::from("data/reference"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = AppConfig::load_from_str("  \n").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.report_format, ReportFormat::Xlsx);
    }

    #[test]
    fn test_invalid_yaml() {
        let result = AppConfig::load_from_str("engine: [not, a, map]");
        assert!(matches!(result, Err(LoadError::Yaml(_))));
    }
}
