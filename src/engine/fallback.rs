//! No-Segment-Data path
//!
//! When a company's segment table is unusable the whole company is judged by
//! its parent activity code, which already uses the target scheme.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::instrument::CompanyAttributes;
use crate::reference::{normalize_code, Eligibility, ReferenceStore};

/// Eligibility of a company judged by its parent activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentAssessment {
    /// The company has no parent activity code; nothing can be said
    NoParentCode,
    /// The parent activity is not in the eligibility table
    NotInScope,
    /// The eligibility table's verdict for the parent activity
    Eligible(Eligibility),
}

impl ParentAssessment {
    /// Text for the "parent eligible" column
    pub fn parent_eligible(&self) -> Option<String> {
        match self {
            ParentAssessment::NoParentCode => None,
            ParentAssessment::NotInScope => Some("Not in scope".to_string()),
            ParentAssessment::Eligible(eligibility) => Some(eligibility.to_string()),
        }
    }

    pub fn eligible_ratio(&self) -> Option<f64> {
        matches!(self, ParentAssessment::Eligible(_)).then_some(1.0)
    }

    pub fn not_in_scope_ratio(&self) -> Option<f64> {
        matches!(self, ParentAssessment::NotInScope).then_some(1.0)
    }
}

impl fmt::Display for ParentAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parent_eligible().unwrap_or_default())
    }
}

impl Serialize for ParentAssessment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.parent_eligible() {
            Some(text) => serializer.serialize_some(&text),
            None => serializer.serialize_none(),
        }
    }
}

pub fn assess_parent(attributes: &CompanyAttributes, store: &ReferenceStore) -> ParentAssessment {
    let Some(code) = attributes
        .parent_activity_code
        .as_deref()
        .map(normalize_code)
        .filter(|code| !code.is_empty())
    else {
        return ParentAssessment::NoParentCode;
    };

    match store.eligibility(&code) {
        Some(eligibility) => ParentAssessment::Eligible(eligibility),
        None => ParentAssessment::NotInScope,
    }
}
