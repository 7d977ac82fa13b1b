//! Report assembly and output
//!
//! A [`PortfolioReport`] is flattened into three sheets:
//!
//! - **Organization Summary**: one row per instrument with the alignment
//!   figures, the parent-activity ratios and the DNSH indicators
//! - **Segment Data Analysis**: one row per segment detail record
//! - **DNSH data**: the raw controversy profile of every instrument
//!
//! By default the sheets go into one workbook with a named worksheet each.
//! They can also be written as one CSV file per sheet or as a single JSON
//! document. File names carry a local `%Y%m%d-%H%M%S_` timestamp prefix so
//! repeated runs never overwrite each other.
//!
//! Every output file is rendered in memory first, written to a hidden
//! `.partial` file beside its target and renamed into place only once all
//! files of the report are staged. A failed write leaves no report behind.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::ReportFormat;
use crate::dnsh::ControversyValue;
use crate::engine::{AlignmentTotals, SegmentDetailRecord, SummaryRecord};
use crate::error::{ReportError, ReportResult};
use crate::portfolio::{DnshRecord, PortfolioReport};

pub const SUMMARY_SHEET: &str = "Organization Summary";
pub const SEGMENT_SHEET: &str = "Segment Data Analysis";
pub const DNSH_SHEET: &str = "DNSH data";

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S_";
const LIST_SEPARATOR: &str = ", ";
const PARTIAL_SUFFIX: &str = ".partial";
const DNSH_COLUMN_WIDTH: f64 = 14.0;

use ColumnFormat::{General, Percent, Thousands, TwoDecimals};

const SUMMARY_COLUMNS: [(&str, ColumnFormat, f64); 21] = [
    ("Instrument", General, 12.0),
    ("Name", General, 40.0),
    ("Delisted?", General, 10.0),
    ("ESG Score", TwoDecimals, 12.0),
    ("TRBC Sector", General, 25.0),
    ("TRBC Activity", General, 31.0),
    ("% of business segment revenues eligible", Percent, 12.0),
    ("% of business segment revenues not in scope", Percent, 12.0),
    ("IF no business segment data is available is the company eligible?", Percent, 14.0),
    ("IF no business segment data is available is the company not in scope?", Percent, 14.0),
    ("Aligned - By industry activity", Percent, 12.0),
    ("Aligned - Passed Screening Criteria Threshold Test", Percent, 12.0),
    ("Aligned Total", Percent, 12.0),
    ("Additional testing needed", Percent, 12.0),
    ("Eligible but not aligned (Did not pass threshold test)", Percent, 12.0),
    ("% FROM OTHER REVENUES", Percent, 12.0),
    ("Total Revenues %", Percent, 12.0),
    ("DNSH Principle - Environment Controversies Count", General, 11.0),
    (
        "Does the company promote environmentally friendly or eco-design products or land impact reduction?",
        General,
        14.0,
    ),
    (
        "DNSH - Environment Red Flag (Count > 0 and promotes environmentally products)",
        General,
        14.0,
    ),
    ("Minimum Social Safeguards - Social Controversies Count", General, 12.0),
];

const SEGMENT_COLUMNS: [(&str, ColumnFormat, f64); 23] = [
    ("Instrument", General, 12.0),
    ("Name", General, 40.0),
    ("Status", General, 10.0),
    ("NAICS 2007 code", General, 30.0),
    ("Segment Name", General, 40.0),
    ("Period", General, 10.0),
    ("Currency", General, 10.0),
    ("Business Total Revenues (Calculated)", Thousands, 15.0),
    ("Segment Revenue as a %", Percent, 10.0),
    ("TRBC Codes", General, 46.0),
    (
        "EU Taxonomy Eligibility\n(Yes: Eligible - Further Testing Needed)\n(No: Eligible - No Further Testing Needed)\n(na: Not in Scope)",
        General,
        24.0,
    ),
    ("Technical Screening Criteria test metric", General, 45.0),
    ("Technical Screening Criteria test field", General, 20.0),
    ("Metric Reported Value", General, 20.0),
    (
        "Technical Screening Criteria test results\n(Not in scope: Eligible but not aligned; did not pass threshold test)\n(Data not available: Further testing needed; data not available)\n(Pass Aligned: Aligned and passed technical screening criteria threshold test)",
        General,
        40.0,
    ),
    ("Segment Weight", Percent, 10.0),
    ("Percentage Aligned - by industry activity", Percent, 12.0),
    ("Additional Testing Required", Percent, 11.0),
    ("Not in Scope", Percent, 10.0),
    ("Percentage Other Revenues", Percent, 10.0),
    (
        "Percentage Aligned - passed technical screening criteria threshold test",
        Percent,
        12.0,
    ),
    ("Percentage Further testing needed; data not available", Percent, 12.0),
    (
        "Percentage Eligible but not aligned (Did not pass threshold test)",
        Percent,
        12.0,
    ),
];

/// Aligned by industry plus aligned after a passed threshold
pub fn aligned_total(totals: &AlignmentTotals) -> f64 {
    totals.aligned_by_industry + totals.aligned_pass
}

/// Revenue accounted for across every outcome column
pub fn total_revenues(totals: &AlignmentTotals) -> f64 {
    totals.not_in_scope
        + aligned_total(totals)
        + totals.additional_testing_needed
        + totals.aligned_not_in_scope
        + totals.others
}

/// One report cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.is_empty() => Cell::Text(value.to_string()),
            _ => Cell::Blank,
        }
    }

    fn number(value: Option<f64>) -> Self {
        value.map_or(Cell::Blank, Cell::Number)
    }

    /// `marker` when set, blank otherwise
    fn marker(set: bool, marker: &str) -> Self {
        if set {
            Cell::Text(marker.to_string())
        } else {
            Cell::Blank
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Blank => Value::Null,
            Cell::Text(text) => Value::String(text.clone()),
            Cell::Number(n) => Value::from(*n),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Blank => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<ControversyValue> for Cell {
    fn from(value: ControversyValue) -> Self {
        match value {
            ControversyValue::Count(n) => Cell::Number(n),
            ControversyValue::Flag(set) => Cell::marker(set, "True"),
            ControversyValue::Missing => Cell::Blank,
        }
    }
}

/// Number format applied to a column in the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFormat {
    General,
    Percent,
    TwoDecimals,
    Thousands,
}

impl ColumnFormat {
    fn num_format(self) -> Option<&'static str> {
        match self {
            General => None,
            Percent => Some("0%"),
            TwoDecimals => Some("0.00"),
            Thousands => Some("#,##0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: String,
    pub format: ColumnFormat,
    pub width: f64,
}

impl Column {
    fn new(header: impl Into<String>, format: ColumnFormat, width: f64) -> Self {
        Self {
            header: header.into(),
            format,
            width,
        }
    }
}

/// A rectangular table of typed cells
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(name: &'static str, columns: Vec<Column>) -> Self {
        Self {
            name,
            columns,
            rows: Vec::new(),
        }
    }

    fn with_layout(name: &'static str, layout: &[(&str, ColumnFormat, f64)]) -> Self {
        Self::new(
            name,
            layout
                .iter()
                .map(|&(header, format, width)| Column::new(header, format, width))
                .collect(),
        )
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.header.as_str())
    }

    /// Cell of a row by header, for inspection
    pub fn cell(&self, row: usize, header: &str) -> Option<&Cell> {
        let idx = self.columns.iter().position(|c| c.header == header)?;
        self.rows.get(row)?.get(idx)
    }

    /// Rows as JSON objects keyed by header; blank cells are `null`
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    let object: Map<String, Value> = self
                        .headers()
                        .map(str::to_string)
                        .zip(row.iter().map(Cell::to_json))
                        .collect();
                    Value::Object(object)
                })
                .collect(),
        )
    }
}

fn joined<T: fmt::Display>(items: &[T]) -> Cell {
    let text = items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR);
    Cell::text(Some(text.as_str()))
}

/// Build the Organization Summary sheet
pub fn summary_sheet(report: &PortfolioReport) -> Sheet {
    let mut sheet = Sheet::with_layout(SUMMARY_SHEET, &SUMMARY_COLUMNS);
    for summary in &report.summaries {
        let dnsh = report.dnsh_for(&summary.instrument).copied().unwrap_or_default();
        let mut row = summary_identity(summary);
        row.extend(alignment_cells(summary));
        row.extend([
            Cell::number(dnsh.environmental_controversies),
            Cell::marker(dnsh.promotes_eco_products, "Yes"),
            Cell::marker(dnsh.red_flag, "Flag"),
            Cell::number(dnsh.social_controversies),
        ]);
        sheet.rows.push(row);
    }
    sheet
}

fn summary_identity(summary: &SummaryRecord) -> Vec<Cell> {
    vec![
        Cell::Text(summary.instrument.clone()),
        Cell::text(summary.name.as_deref()),
        Cell::marker(summary.delisted, "Yes"),
        Cell::number(summary.esg_score),
        Cell::text(summary.economic_sector.as_deref()),
        Cell::text(summary.activity_name.as_deref()),
    ]
}

fn figure(totals: Option<&AlignmentTotals>, value: fn(&AlignmentTotals) -> f64) -> Cell {
    Cell::number(totals.map(value))
}

fn alignment_cells(summary: &SummaryRecord) -> Vec<Cell> {
    let totals = summary.alignment.as_ref();
    vec![
        figure(totals, |t| t.eligible),
        figure(totals, |t| t.not_in_scope),
        Cell::number(summary.parent_eligible_ratio()),
        Cell::number(summary.parent_not_in_scope_ratio()),
        figure(totals, |t| t.aligned_by_industry),
        figure(totals, |t| t.aligned_pass),
        figure(totals, aligned_total),
        figure(totals, |t| t.additional_testing_needed),
        figure(totals, |t| t.aligned_not_in_scope),
        figure(totals, |t| t.others),
        figure(totals, total_revenues),
    ]
}

/// Build the Segment Data Analysis sheet
pub fn segment_sheet(report: &PortfolioReport) -> Sheet {
    let mut sheet = Sheet::with_layout(SEGMENT_SHEET, &SEGMENT_COLUMNS);
    sheet.rows = report.segments.iter().map(segment_row).collect();
    sheet
}

fn segment_row(record: &SegmentDetailRecord) -> Vec<Cell> {
    let segment = &record.segment;
    let mut row = vec![
        Cell::Text(record.instrument.clone()),
        Cell::text(record.name.as_deref()),
        Cell::text(Some(record.status.as_str())),
        Cell::text(Some(segment.segment_code.as_str())),
        Cell::text(segment.segment_name.as_deref()),
        Cell::text(segment.fiscal_period.as_deref()),
        Cell::text(segment.currency.as_deref()),
        Cell::number(segment.revenue),
    ];

    let Some(analysis) = &record.analysis else {
        row.resize(SEGMENT_COLUMNS.len(), Cell::Blank);
        return row;
    };

    let threshold = analysis.threshold.as_ref();
    let b = &analysis.buckets;
    row.extend([
        Cell::Number(analysis.revenue_share),
        joined(&analysis.mapped_codes),
        joined(&analysis.eligibility),
        analysis.linked_metric_names().map_or(Cell::Blank, joined),
        threshold.map_or(Cell::Blank, |t| joined(&t.metric_fields)),
        threshold.map_or(Cell::Blank, |t| joined(&t.reported_values)),
        threshold.map_or(Cell::Blank, |t| joined(&t.verdicts)),
        Cell::Number(analysis.code_weight),
        Cell::Number(b.aligned),
        Cell::Number(b.additional_testing_required),
        Cell::Number(b.not_in_scope),
        Cell::Number(b.other),
        Cell::Number(b.aligned_pass),
        Cell::Number(b.aligned_no_data),
        Cell::Number(b.aligned_not_in_scope),
    ]);
    row
}

/// Build the DNSH data sheet
///
/// Columns are the union of every profile's fields in first-seen order.
/// False flags are left blank.
pub fn dnsh_sheet(report: &PortfolioReport) -> Sheet {
    let mut fields: Vec<&str> = Vec::new();
    for record in &report.dnsh {
        for (name, _) in &record.profile.fields {
            if !fields.contains(&name.as_str()) {
                fields.push(name);
            }
        }
    }

    let columns = std::iter::once("Instrument")
        .chain(fields.iter().copied())
        .map(|header| Column::new(header, General, DNSH_COLUMN_WIDTH))
        .collect();
    let mut sheet = Sheet::new(DNSH_SHEET, columns);
    sheet.rows = report
        .dnsh
        .iter()
        .map(|record| dnsh_row(record, &fields))
        .collect();
    sheet
}

fn dnsh_row(record: &DnshRecord, fields: &[&str]) -> Vec<Cell> {
    std::iter::once(Cell::Text(record.instrument.clone()))
        .chain(fields.iter().map(|f| Cell::from(record.profile.get(f))))
        .collect()
}

/// All three sheets in output order
pub fn build_sheets(report: &PortfolioReport) -> [Sheet; 3] {
    [
        summary_sheet(report),
        segment_sheet(report),
        dnsh_sheet(report),
    ]
}

/// Writes a portfolio report to disk
#[derive(Debug, Clone)]
pub struct ReportWriter {
    /// Requested report name; its directory and stem name the output files
    target: PathBuf,
    format: ReportFormat,
}

impl ReportWriter {
    pub fn new(target: impl Into<PathBuf>, format: ReportFormat) -> Self {
        Self {
            target: target.into(),
            format,
        }
    }

    /// Write the report stamped with the current local time
    pub fn write(&self, report: &PortfolioReport) -> ReportResult<Vec<PathBuf>> {
        self.write_at(report, Local::now().naive_local())
    }

    /// Write the report stamped with `at`; returns the files created
    ///
    /// Either every file of the report is created or none is.
    pub fn write_at(&self, report: &PortfolioReport, at: NaiveDateTime) -> ReportResult<Vec<PathBuf>> {
        let prefix = at.format(TIMESTAMP_FORMAT).to_string();
        let sheets = build_sheets(report);

        let mut staged = StagedFiles::default();
        match self.format {
            ReportFormat::Xlsx => {
                let path = self.output_path(&prefix, "", "xlsx");
                staged.stage(path, &render_xlsx(&sheets)?)?;
            }
            ReportFormat::Csv => {
                for sheet in &sheets {
                    let path = self.output_path(&prefix, sheet_suffix(sheet.name), "csv");
                    staged.stage(path, &render_csv(sheet)?)?;
                }
            }
            ReportFormat::Json => {
                let path = self.output_path(&prefix, "", "json");
                staged.stage(path, &render_json(&sheets)?)?;
            }
        }
        let written = staged.commit()?;

        info!(files = written.len(), "Report written");
        Ok(written)
    }

    fn output_path(&self, prefix: &str, suffix: &str, extension: &str) -> PathBuf {
        let stem = self
            .target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        let name = format!("{}{}{}.{}", prefix, stem, suffix, extension);
        match self.target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
            _ => PathBuf::from(name),
        }
    }
}

fn sheet_suffix(name: &str) -> &'static str {
    match name {
        SUMMARY_SHEET => "_summary",
        SEGMENT_SHEET => "_segments",
        _ => "_dnsh",
    }
}

/// Output files written beside their targets, renamed into place on commit
///
/// Anything not committed is removed on drop.
#[derive(Default)]
struct StagedFiles {
    /// (partial file, final path)
    files: Vec<(PathBuf, PathBuf)>,
}

impl StagedFiles {
    fn stage(&mut self, target: PathBuf, bytes: &[u8]) -> ReportResult<()> {
        let partial = partial_path(&target);
        self.files.push((partial.clone(), target.clone()));
        fs::write(&partial, bytes).map_err(|e| ReportError::from_io(&target, e))
    }

    fn commit(mut self) -> ReportResult<Vec<PathBuf>> {
        let mut committed: Vec<PathBuf> = Vec::with_capacity(self.files.len());
        for (partial, target) in &self.files {
            if let Err(e) = fs::rename(partial, target) {
                for path in &committed {
                    if let Err(cleanup) = fs::remove_file(path) {
                        warn!(path = %path.display(), error = %cleanup, "Failed to remove report file");
                    }
                }
                return Err(ReportError::from_io(target, e));
            }
            committed.push(target.clone());
        }
        self.files.clear();
        Ok(committed)
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        for (partial, _) in &self.files {
            // already renamed or never created
            let _ = fs::remove_file(partial);
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}{}", name, PARTIAL_SUFFIX))
}

fn column_index(idx: usize) -> Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

fn row_index(idx: usize) -> Result<u32, XlsxError> {
    u32::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Workbook with one worksheet per sheet: bold wrapped headers, number
/// formats per column, first row and column frozen
fn render_xlsx(sheets: &[Sheet]) -> ReportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border_bottom(FormatBorder::Thin);

    for sheet in sheets {
        let formats: Vec<Option<Format>> = sheet
            .columns
            .iter()
            .map(|c| c.format.num_format().map(|f| Format::new().set_num_format(f)))
            .collect();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;
        for (idx, column) in sheet.columns.iter().enumerate() {
            let col = column_index(idx)?;
            worksheet.write_string_with_format(0, col, column.header.as_str(), &header_format)?;
            worksheet.set_column_width(col, column.width)?;
        }

        for (r, cells) in sheet.rows.iter().enumerate() {
            let row = row_index(r + 1)?;
            for (idx, cell) in cells.iter().enumerate() {
                let col = column_index(idx)?;
                match (cell, formats.get(idx).and_then(Option::as_ref)) {
                    (Cell::Blank, _) => {}
                    (Cell::Text(text), _) => {
                        worksheet.write_string(row, col, text.as_str())?;
                    }
                    (Cell::Number(n), Some(format)) => {
                        worksheet.write_number_with_format(row, col, *n, format)?;
                    }
                    (Cell::Number(n), None) => {
                        worksheet.write_number(row, col, *n)?;
                    }
                }
            }
        }
        worksheet.set_freeze_panes(1, 1)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn render_csv(sheet: &Sheet) -> ReportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(sheet.headers())?;
    for row in &sheet.rows {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::Csv(csv::Error::from(e.into_error())))
}

fn render_json(sheets: &[Sheet]) -> ReportResult<Vec<u8>> {
    let document: Map<String, Value> = sheets
        .iter()
        .map(|sheet| (sheet.name.to_string(), sheet.to_json()))
        .collect();
    Ok(serde_json::to_vec_pretty(&Value::Object(document))?)
}
