//! Market-data sources
//!
//! A source supplies, per instrument, the raw business-segment table, the
//! company attribute record and the controversy profile. `SnapshotSource`
//! reads all three from CSV exports of a previous data pull:
//!
//! | file                | key          | columns                                                     |
//! |---------------------|--------------|-------------------------------------------------------------|
//! | `segments.csv`      | `Instrument` | `Segment Code`, `Segment Name`, `Period`, `Currency`, `Business Total Revenues (Calculated)` |
//! | `attributes.csv`    | `Instrument` | `Company Common Name`, `ESG Score`, `TRBC Economic Sector Name`, `TRBC Activity Code`, `TRBC Activity Name`, one column per metric field |
//! | `controversies.csv` | `Instrument` | one column per controversy count or flag                    |

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::dnsh::{ControversyProfile, ControversyValue};
use crate::error::{LoadResult, MarketDataError, MarketDataResult};
use crate::instrument::{CompanyAttributes, InstrumentData, SegmentRow};
use crate::reference::normalize_code;
use crate::tabular::{Row, Table};

pub const SEGMENTS_FILE: &str = "segments.csv";
pub const ATTRIBUTES_FILE: &str = "attributes.csv";
pub const CONTROVERSIES_FILE: &str = "controversies.csv";

const COL_INSTRUMENT: &str = "Instrument";
const COL_SEGMENT_CODE: &str = "Segment Code";
const COL_SEGMENT_NAME: &str = "Segment Name";
const COL_PERIOD: &str = "Period";
const COL_CURRENCY: &str = "Currency";
const COL_REVENUE: &str = "Business Total Revenues (Calculated)";
const COL_NAME: &str = "Company Common Name";
const COL_ESG_SCORE: &str = "ESG Score";
const COL_SECTOR: &str = "TRBC Economic Sector Name";
const COL_ACTIVITY_CODE: &str = "TRBC Activity Code";
const COL_ACTIVITY_NAME: &str = "TRBC Activity Name";

const ATTRIBUTE_COLUMNS: [&str; 6] = [
    COL_INSTRUMENT,
    COL_NAME,
    COL_ESG_SCORE,
    COL_SECTOR,
    COL_ACTIVITY_CODE,
    COL_ACTIVITY_NAME,
];

/// Access credential for a market-data service; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Something that can supply per-instrument input data
pub trait MarketDataSource {
    /// Authenticate; must succeed before `fetch`
    fn connect(&mut self, credential: &Credential) -> MarketDataResult<()>;

    /// Data for each requested instrument, in request order
    ///
    /// `fields` lists the attribute fields the reference tables need.
    /// Instruments the source knows nothing about come back with empty
    /// segments and attributes rather than failing the batch.
    fn fetch(&self, instruments: &[String], fields: &[String]) -> MarketDataResult<Vec<InstrumentData>>;
}

/// File-backed source reading a directory of CSV exports
#[derive(Debug)]
pub struct SnapshotSource {
    dir: PathBuf,
    tables: Option<SnapshotTables>,
}

#[derive(Debug)]
struct SnapshotTables {
    segments: Table,
    attributes: Table,
    controversies: Option<Table>,
}

impl SnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tables: None,
        }
    }

    fn load_tables(&self) -> LoadResult<SnapshotTables> {
        let segments = Table::from_path(&self.dir.join(SEGMENTS_FILE))?;
        let attributes = Table::from_path(&self.dir.join(ATTRIBUTES_FILE))?;
        segments.column(COL_INSTRUMENT)?;
        segments.column(COL_SEGMENT_CODE)?;
        attributes.column(COL_INSTRUMENT)?;

        let controversies_path = self.dir.join(CONTROVERSIES_FILE);
        let controversies = if controversies_path.exists() {
            let table = Table::from_path(&controversies_path)?;
            table.column(COL_INSTRUMENT)?;
            Some(table)
        } else {
            warn!(
                "No {} in {}, DNSH indicators will be empty",
                CONTROVERSIES_FILE,
                self.dir.display()
            );
            None
        };

        Ok(SnapshotTables {
            segments,
            attributes,
            controversies,
        })
    }
}

impl MarketDataSource for SnapshotSource {
    fn connect(&mut self, credential: &Credential) -> MarketDataResult<()> {
        if credential.is_empty() {
            return Err(MarketDataError::MissingCredential);
        }
        self.tables = Some(self.load_tables()?);
        info!("Market data snapshot opened at {}", self.dir.display());
        Ok(())
    }

    fn fetch(&self, instruments: &[String], fields: &[String]) -> MarketDataResult<Vec<InstrumentData>> {
        let tables = self.tables.as_ref().ok_or(MarketDataError::NotConnected)?;

        let mut segments: HashMap<&str, Vec<SegmentRow>> = HashMap::new();
        for row in tables.segments.rows() {
            if let Some(instrument) = row.get(COL_INSTRUMENT) {
                segments
                    .entry(instrument)
                    .or_default()
                    .push(parse_segment(&row)?);
            }
        }

        let metric_columns: Vec<&str> = tables
            .attributes
            .other_columns(&ATTRIBUTE_COLUMNS)
            .filter(|column| fields.iter().any(|f| f.as_str() == *column))
            .collect();
        let mut attributes: HashMap<&str, CompanyAttributes> = HashMap::new();
        for row in tables.attributes.rows() {
            if let Some(instrument) = row.get(COL_INSTRUMENT) {
                // first row per instrument wins
                if !attributes.contains_key(instrument) {
                    attributes.insert(instrument, parse_attributes(&row, &metric_columns)?);
                }
            }
        }

        let mut controversies: HashMap<&str, ControversyProfile> = HashMap::new();
        if let Some(table) = &tables.controversies {
            let columns: Vec<&str> = table.other_columns(&[COL_INSTRUMENT]).collect();
            for row in table.rows() {
                if let Some(instrument) = row.get(COL_INSTRUMENT) {
                    controversies.entry(instrument).or_insert_with(|| ControversyProfile {
                        fields: columns
                            .iter()
                            .map(|c| (c.to_string(), ControversyValue::parse(row.get(c))))
                            .collect(),
                    });
                }
            }
        }

        Ok(instruments
            .iter()
            .map(|instrument| {
                let key = instrument.as_str();
                if !attributes.contains_key(key) {
                    warn!(instrument = key, "No attribute record in snapshot");
                }
                InstrumentData {
                    instrument: instrument.clone(),
                    segments: segments.get(key).cloned().unwrap_or_default(),
                    attributes: attributes.get(key).cloned().unwrap_or_default(),
                    controversies: controversies.get(key).cloned().unwrap_or_default(),
                }
            })
            .collect())
    }
}

fn parse_segment(row: &Row<'_>) -> LoadResult<SegmentRow> {
    Ok(SegmentRow {
        segment_code: row.get(COL_SEGMENT_CODE).unwrap_or_default().to_string(),
        segment_name: row.get(COL_SEGMENT_NAME).map(str::to_string),
        fiscal_period: row.get(COL_PERIOD).map(str::to_string),
        currency: row.get(COL_CURRENCY).map(str::to_string),
        revenue: row.number(COL_REVENUE)?,
    })
}

fn parse_attributes(row: &Row<'_>, metric_columns: &[&str]) -> LoadResult<CompanyAttributes> {
    let mut attributes = CompanyAttributes {
        name: row.get(COL_NAME).map(str::to_string),
        esg_score: row.number(COL_ESG_SCORE)?,
        sector_name: row.get(COL_SECTOR).map(str::to_string),
        parent_activity_code: row.get(COL_ACTIVITY_CODE).map(normalize_code),
        parent_activity_name: row.get(COL_ACTIVITY_NAME).map(str::to_string),
        ..Default::default()
    };
    for column in metric_columns {
        attributes
            .metrics
            .insert(column.to_string(), row.number(column)?);
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use std::fs;

    fn snapshot_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SEGMENTS_FILE),
            "Instrument,Segment Code,Segment Name,Period,Currency,Business Total Revenues (Calculated)\n\
             ABC.L,541990,Consulting,FY2023,GBP,80\n\
             ABC.L,221100,Power,FY2023,GBP,20\n\
             ABC.L,SEGMTL,Total,FY2023,GBP,100\n\
             DEF.PA,,,,,\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(ATTRIBUTES_FILE),
            "Instrument,Company Common Name,ESG Score,TRBC Economic Sector Name,TRBC Activity Code,TRBC Activity Name,TR.CO2,TR.Unrequested\n\
             ABC.L,Alpha plc,71.5,Industrials,5010101010.0,Consulting,7,1\n\
             DEF.PA,Delta SA,,Utilities,,,,\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(CONTROVERSIES_FILE),
            "Instrument,Environmental Controversies Count,Eco-Design Products\n\
             ABC.L,2,True\n",
        )
        .unwrap();
        dir
    }

    fn fields() -> Vec<String> {
        vec!["TR.CO2".to_string()]
    }

    #[test]
    fn test_fetch_requires_connect() {
        let dir = snapshot_dir();
        let source = SnapshotSource::new(dir.path());
        let result = source.fetch(&["ABC.L".to_string()], &fields());
        assert!(matches!(result, Err(MarketDataError::NotConnected)));
    }

    #[test]
    fn test_connect_rejects_blank_credential() {
        let dir = snapshot_dir();
        let mut source = SnapshotSource::new(dir.path());
        let result = source.connect(&Credential::new("  "));
        assert!(matches!(result, Err(MarketDataError::MissingCredential)));
    }

    #[test]
    fn test_fetch_in_request_order() {
        let dir = snapshot_dir();
        let mut source = SnapshotSource::new(dir.path());
        source.connect(&Credential::new("key")).unwrap();

        let requested = vec![
            "DEF.PA".to_string(),
            "ABC.L".to_string(),
            "ZZZ.N".to_string(),
        ];
        let data = source.fetch(&requested, &fields()).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0].instrument, "DEF.PA");
        assert_eq!(data[2].instrument, "ZZZ.N");
        assert!(data[2].segments.is_empty());

        let abc = &data[1];
        assert_eq!(abc.segments.len(), 3);
        assert_eq!(abc.segments[0].revenue, Some(80.0));
        assert_eq!(abc.segments[0].segment_name.as_deref(), Some("Consulting"));
        assert_eq!(abc.attributes.esg_score, Some(71.5));
        assert_eq!(
            abc.attributes.parent_activity_code.as_deref(),
            Some("5010101010")
        );
        assert_eq!(abc.attributes.metrics.get("TR.CO2"), Some(&Some(7.0)));
        assert!(!abc.attributes.metrics.contains_key("TR.Unrequested"));
        assert_eq!(
            abc.controversies.get("Eco-Design Products"),
            ControversyValue::Flag(true)
        );

        let def = &data[0];
        assert_eq!(def.segments[0].revenue, None);
        assert_eq!(def.attributes.metrics.get("TR.CO2"), Some(&None));
        assert!(def.controversies.is_empty());
    }

    #[test]
    fn test_missing_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SnapshotSource::new(dir.path());
        let result = source.connect(&Credential::new("key"));
        assert!(matches!(
            result,
            Err(MarketDataError::Load(LoadError::Csv { .. }))
        ));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("secret-key");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert_eq!(credential.expose(), "secret-key");
    }
}
