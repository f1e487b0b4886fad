//! Normalization of directory records and the GDP estimate.
//!
//! Currency rules, applied per country:
//! - no currency code -> no rate, `estimated_gdp = 0`
//! - code not in the rate table -> no rate, no estimate
//! - code found -> rate stored, estimate derived by the configured [`GdpModel`]

use crate::error::ValidationErrors;
use crate::models::{NewCountry, PopulationField, RawCountry};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Bounds of the random multiplier used by [`GdpModel::Randomized`].
pub const MULTIPLIER_MIN: f64 = 1000.0;
pub const MULTIPLIER_MAX: f64 = 2000.0;

/// How `estimated_gdp` is derived from population and exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GdpModel {
    /// `population × rate`.
    #[default]
    RateProduct,
    /// `population × multiplier ÷ rate`, multiplier uniform in `[1000, 2000]`.
    Randomized,
}

impl FromStr for GdpModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rate_product" | "product" => Ok(GdpModel::RateProduct),
            "randomized" | "random" => Ok(GdpModel::Randomized),
            other => Err(format!(
                "unknown GDP model '{other}', expected 'rate_product' or 'randomized'"
            )),
        }
    }
}

/// Source of the per-country multiplier. Tests pin it to a constant.
pub trait Multiplier {
    fn next_multiplier(&mut self) -> f64;
}

/// Uniform draw from `[MULTIPLIER_MIN, MULTIPLIER_MAX]`.
#[derive(Debug, Default)]
pub struct RandomMultiplier;

impl Multiplier for RandomMultiplier {
    fn next_multiplier(&mut self) -> f64 {
        rand::rng().random_range(MULTIPLIER_MIN..=MULTIPLIER_MAX)
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedMultiplier(pub f64);

impl Multiplier for FixedMultiplier {
    fn next_multiplier(&mut self) -> f64 {
        self.0
    }
}

impl GdpModel {
    /// `None` when the rate cannot produce a meaningful estimate.
    pub fn estimate(&self, population: i64, rate: f64, m: &mut dyn Multiplier) -> Option<f64> {
        if !rate.is_finite() {
            return None;
        }
        match self {
            GdpModel::RateProduct => Some(population as f64 * rate),
            GdpModel::Randomized => {
                if rate == 0.0 {
                    return None;
                }
                Some(population as f64 * m.next_multiplier() / rate)
            }
        }
    }
}

/// Validate one raw record and attach its rate and GDP estimate.
pub fn normalize(
    raw: &RawCountry,
    rates: &HashMap<String, f64>,
    model: GdpModel,
    m: &mut dyn Multiplier,
) -> Result<NewCountry, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if name.is_none() {
        errors.insert("name".into(), "is required".into());
    }

    let population = match raw.population {
        None => {
            errors.insert("population".into(), "is required".into());
            None
        }
        Some(PopulationField::NotInteger) => {
            errors.insert("population".into(), "must be an integer".into());
            None
        }
        Some(PopulationField::OutOfRange) => {
            errors.insert("population".into(), "is out of range".into());
            None
        }
        Some(PopulationField::Integer(p)) if p < 0 => {
            errors.insert("population".into(), "must be a non-negative integer".into());
            None
        }
        Some(PopulationField::Integer(p)) => Some(p),
    };

    let (Some(name), Some(population)) = (name, population) else {
        return Err(errors);
    };

    let currency_code = raw.first_currency_code().map(str::to_string);
    let (exchange_rate, estimated_gdp) = match currency_code.as_deref() {
        None => (None, Some(0.0)),
        Some(code) => match rates.get(code) {
            Some(&rate) => (Some(rate), model.estimate(population, rate, m)),
            None => (None, None),
        },
    };

    Ok(NewCountry {
        name: name.to_string(),
        capital: raw.capital.clone(),
        region: raw.region.clone(),
        population,
        currency_code,
        exchange_rate,
        estimated_gdp,
        flag_url: raw.flag.clone(),
    })
}

/// Normalize a full directory. The first invalid record aborts the batch.
pub fn normalize_all(
    raws: &[RawCountry],
    rates: &HashMap<String, f64>,
    model: GdpModel,
    m: &mut dyn Multiplier,
) -> Result<Vec<NewCountry>, ValidationErrors> {
    raws.iter()
        .map(|raw| normalize(raw, rates, model, &mut *m))
        .collect()
}
