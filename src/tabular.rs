//! Header-addressed tables
//!
//! Every input this crate reads is a sheet whose columns are identified by
//! header text rather than position. The sheet is either a CSV export or the
//! first worksheet of a workbook (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`).
//! `Table` reads the whole file once and hands out rows that resolve columns
//! by name.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{LoadError, LoadResult};

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    headers: csv::StringRecord,
    records: Vec<csv::StringRecord>,
}

impl Table {
    /// Read a CSV file or the first worksheet of a workbook, by extension
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        if is_workbook(path) {
            return Self::from_workbook(path);
        }
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(path)
            .map_err(|e| LoadError::csv(path, e))?;
        Self::from_reader(reader, path)
    }

    /// Parse CSV text; `origin` is only used in error messages
    pub fn parse_str(content: &str, origin: &Path) -> LoadResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());
        Self::from_reader(reader, origin)
    }

    fn from_workbook(path: &Path) -> LoadResult<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::workbook(path, e))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::EmptyWorkbook {
                path: path.to_path_buf(),
            })?
            .map_err(|e| LoadError::workbook(path, e))?;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(cells) => cells
                .iter()
                .map(|cell| cell_text(cell).trim().to_string())
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };
        let records = rows
            .map(|cells| csv::StringRecord::from(cells.iter().map(cell_text).collect::<Vec<_>>()))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            headers: csv::StringRecord::from(headers),
            records,
        })
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>, path: &Path) -> LoadResult<Self> {
        let headers = reader
            .headers()
            .map_err(|e| LoadError::csv(path, e))?
            .clone();
        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoadError::csv(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Position of a column that must exist
    pub fn column(&self, name: &str) -> LoadResult<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::missing_column(name, &self.path))
    }

    /// Column names other than the ones listed
    pub fn other_columns<'a>(&'a self, except: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
        self.headers.iter().filter(move |h| !except.contains(h))
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().enumerate().map(move |(idx, record)| Row {
            table: self,
            record,
            // header is line 1
            line: idx + 2,
        })
    }
}

/// One data row of a `Table`
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    record: &'a csv::StringRecord,
    line: usize,
}

impl<'a> Row<'a> {
    pub fn line(&self) -> usize {
        self.line
    }

    /// Cell text for a column, `None` when the column or the cell is blank
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.headers.iter().position(|h| h == column)?;
        self.get_at(idx)
    }

    pub fn get_at(&self, idx: usize) -> Option<&'a str> {
        self.record
            .get(idx)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Parse a numeric cell, reporting the column and line on failure
    pub fn number(&self, column: &str) -> LoadResult<Option<f64>> {
        match self.get(column) {
            None => Ok(None),
            Some(value) if is_null_marker(value) => Ok(None),
            Some(value) => value
                .parse::<f64>()
                .map(Some)
                .map_err(|_| LoadError::InvalidValue {
                    column: column.to_string(),
                    value: value.to_string(),
                    row: self.line,
                }),
        }
    }
}

/// Spellings a spreadsheet export uses for an empty numeric cell
pub fn is_null_marker(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "" | "nan" | "null" | "none" | "<na>" | "#n/a"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Instrument, Revenue ,Name\nABC.L,12.5,Alpha\nDEF.L,,Delta\nGHI.L,oops,Gamma\n";

    fn table() -> Table {
        Table::parse_str(SAMPLE, Path::new("sample.csv")).unwrap()
    }

    #[test]
    fn test_headers_are_trimmed() {
        let table = table();
        assert!(table.has_column("Revenue"));
        assert_eq!(table.column("Name").unwrap(), 2);
        assert!(matches!(
            table.column("Missing"),
            Err(LoadError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_row_access() {
        let table = table();
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("Instrument"), Some("ABC.L"));
        assert_eq!(rows[0].number("Revenue").unwrap(), Some(12.5));
        assert_eq!(rows[1].number("Revenue").unwrap(), None);
        assert_eq!(rows[1].line(), 3);
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let table = table();
        let row = table.rows().nth(2).unwrap();
        match row.number("Revenue") {
            Err(LoadError::InvalidValue { row, value, .. }) => {
                assert_eq!(row, 4);
                assert_eq!(value, "oops");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_other_columns() {
        let table = table();
        let others: Vec<_> = table.other_columns(&["Instrument"]).collect();
        assert_eq!(others, vec!["Revenue", "Name"]);
    }

    #[test]
    fn test_workbook_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, " Name ").unwrap();
        sheet.write_string(0, 1, "RIC").unwrap();
        sheet.write_string(0, 2, "Revenue").unwrap();
        sheet.write_string(1, 0, "Alpha").unwrap();
        sheet.write_string(1, 1, "ABC.L").unwrap();
        sheet.write_number(1, 2, 12.5).unwrap();
        sheet.write_string(2, 1, "DEF.L").unwrap();
        workbook.save(&path).unwrap();

        let table = Table::from_path(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.has_column("Name"));
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("RIC"), Some("ABC.L"));
        assert_eq!(rows[0].number("Revenue").unwrap(), Some(12.5));
        assert_eq!(rows[1].get("Name"), None);
        assert_eq!(rows[1].number("Revenue").unwrap(), None);
    }

    #[test]
    fn test_unreadable_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        assert!(matches!(
            Table::from_path(&path),
            Err(LoadError::Workbook { .. })
        ));
    }

    #[test]
    fn test_null_markers() {
        assert!(is_null_marker("NaN"));
        assert!(is_null_marker(" "));
        assert!(!is_null_marker("0"));
    }
}
