//! Code Mapper
//!
//! Translates a segment's source-scheme industry codes into the crosswalk's
//! target scheme.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::reference::ReferenceStore;

/// Sentinel written for a numeric code the crosswalk does not know
pub const UNMAPPED_MARKER: &str = "0";

/// A segment code after crosswalk translation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappedCode {
    Target(String),
    Unmapped,
}

impl MappedCode {
    pub fn target(&self) -> Option<&str> {
        match self {
            MappedCode::Target(code) => Some(code),
            MappedCode::Unmapped => None,
        }
    }
}

impl fmt::Display for MappedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappedCode::Target(code) => f.write_str(code),
            MappedCode::Unmapped => f.write_str(UNMAPPED_MARKER),
        }
    }
}

impl Serialize for MappedCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Map a comma-delimited code list, in order
///
/// Entries are trimmed before the numeric check, so `" 221100"` is mapped.
/// Non-numeric entries are skipped without leaving a slot in the output, so
/// the result can be shorter than the input list.
pub fn map_codes(raw: &str, store: &ReferenceStore, code_width: usize) -> Vec<MappedCode> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| is_numeric(code))
        .map(|code| {
            pad_code(code, code_width)
                .parse::<u64>()
                .ok()
                .and_then(|source| store.target_code(source))
                .map_or(MappedCode::Unmapped, |target| {
                    MappedCode::Target(target.to_string())
                })
        })
        .collect()
}

/// Right-pad a short code with zeros up to `width` characters
pub fn pad_code(code: &str, width: usize) -> String {
    format!("{:0<width$}", code, width = width)
}

fn is_numeric(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_digit())
}
