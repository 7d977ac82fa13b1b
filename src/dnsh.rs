//! "Do no significant harm" screening
//!
//! Controversy counts and product flags reported for a company are reduced to
//! four summary indicators that sit beside the alignment figures in the
//! report: environmental controversy count, whether the company promotes
//! environmentally friendly products, a red flag when both hold, and the
//! overall controversy count used for the minimum social safeguards check.

use serde::{Deserialize, Serialize};

pub const ENV_CONTROVERSIES: &str = "Environmental Controversies Count";
pub const RECENT_ENV_CONTROVERSIES: &str = "Recent Environmental Controversies";
pub const ENV_PRODUCTS: &str = "Environmental Products";
pub const LAND_IMPACT_REDUCTION: &str = "Land Environmental Impact Reduction";
pub const ECO_DESIGN_PRODUCTS: &str = "Eco-Design Products";

const PROMOTION_FLAGS: [&str; 3] = [ENV_PRODUCTS, LAND_IMPACT_REDUCTION, ECO_DESIGN_PRODUCTS];

/// A single controversy field value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControversyValue {
    Count(f64),
    Flag(bool),
    Missing,
}

impl ControversyValue {
    /// Interpret a raw cell: `True`/`False` are flags, numbers are counts
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return ControversyValue::Missing;
        };
        match raw.to_lowercase().as_str() {
            "true" => ControversyValue::Flag(true),
            "false" => ControversyValue::Flag(false),
            _ => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map_or(ControversyValue::Missing, ControversyValue::Count),
        }
    }

    pub fn count(&self) -> f64 {
        match self {
            ControversyValue::Count(n) => *n,
            _ => 0.0,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ControversyValue::Flag(true))
    }
}

/// Controversy fields for one company, in the order the source reported them
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControversyProfile {
    pub fields: Vec<(String, ControversyValue)>,
}

impl ControversyProfile {
    pub fn with(mut self, field: impl Into<String>, value: ControversyValue) -> Self {
        self.fields.push((field.into(), value));
        self
    }

    pub fn get(&self, field: &str) -> ControversyValue {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map_or(ControversyValue::Missing, |(_, value)| *value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Summary DNSH indicators for one company
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DnshAssessment {
    /// Current plus recent environmental controversies, absent when zero
    pub environmental_controversies: Option<f64>,
    pub promotes_eco_products: bool,
    pub red_flag: bool,
    /// All controversy counts summed, absent when zero
    pub social_controversies: Option<f64>,
}

impl DnshAssessment {
    pub fn assess(profile: &ControversyProfile) -> Self {
        let env_total =
            profile.get(ENV_CONTROVERSIES).count() + profile.get(RECENT_ENV_CONTROVERSIES).count();
        let environmental_controversies = (env_total != 0.0).then_some(env_total);

        let promotes_eco_products = PROMOTION_FLAGS.iter().any(|f| profile.get(f).is_set());

        let social_total: f64 = profile.fields.iter().map(|(_, v)| v.count()).sum();

        Self {
            environmental_controversies,
            promotes_eco_products,
            red_flag: promotes_eco_products && env_total > 0.0,
            social_controversies: (social_total != 0.0).then_some(social_total),
        }
    }
}
