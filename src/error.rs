//! Error handling for the taxonomy alignment system
//!
//! Missing business data (unmapped codes, absent metrics, immaterial revenue)
//! is never an error here; those are classification outcomes. The types below
//! cover the collaborators around the engine: loading tables, fetching
//! instrument data and writing the report.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for the taxonomy alignment system
#[derive(Error, Debug)]
pub enum TaxoError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Errors raised while reading reference tables, portfolios or config files
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Workbook {path} has no worksheet")]
    EmptyWorkbook { path: PathBuf },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Invalid value '{value}' for column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        value: String,
        row: usize,
    },
}

impl LoadError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        LoadError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn workbook(path: &Path, source: calamine::Error) -> Self {
        LoadError::Workbook {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn missing_column(column: &str, path: &Path) -> Self {
        LoadError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        }
    }
}

/// Errors from a market-data source
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("No access credential supplied")]
    MissingCredential,

    #[error("Market data source is not connected")]
    NotConnected,

    #[error("Failed to load market data: {0}")]
    Load(#[from] LoadError),
}

/// Errors from the report writer
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Permission denied writing {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Workbook write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    /// Classify an I/O failure, separating permission problems from the rest
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            ReportError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            ReportError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ReportError::PermissionDenied { .. })
    }
}

/// Result type aliases for convenience
pub type TaxoResult<T> = Result<T, TaxoError>;
pub type LoadResult<T> = Result<T, LoadError>;
pub type MarketDataResult<T> = Result<T, MarketDataError>;
pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_classified() {
        let err = ReportError::from_io(
            Path::new("report.csv"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.is_permission_denied());

        let err = ReportError::from_io(
            Path::new("report.csv"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn test_error_conversion() {
        let load = LoadError::missing_column("RIC", Path::new("input.csv"));
        let err: TaxoError = load.into();
        assert!(matches!(err, TaxoError::Load(LoadError::MissingColumn { .. })));
        assert_eq!(
            err.to_string(),
            "Load error: Missing required column 'RIC' in input.csv"
        );
    }
}
