use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How listings are ordered. Unknown or missing values fall back to `Name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    GdpDesc,
    GdpAsc,
    PopulationDesc,
    PopulationAsc,
    #[default]
    Name,
}

impl SortOrder {
    /// Lenient parse used for query strings: anything unrecognized sorts by name.
    pub fn from_param(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("gdp_desc") => SortOrder::GdpDesc,
            Some("gdp_asc") => SortOrder::GdpAsc,
            Some("population_desc") => SortOrder::PopulationDesc,
            Some("population_asc") => SortOrder::PopulationAsc,
            _ => SortOrder::Name,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::GdpDesc => "gdp_desc",
            SortOrder::GdpAsc => "gdp_asc",
            SortOrder::PopulationDesc => "population_desc",
            SortOrder::PopulationAsc => "population_asc",
            SortOrder::Name => "name",
        }
    }
}

/// Filters and ordering for `GET /countries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl CountryQuery {
    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from_param(self.sort.as_deref())
    }

    /// Empty filter values (`?region=`) are treated as absent.
    pub fn region_filter(&self) -> Option<&str> {
        non_blank(self.region.as_deref())
    }

    pub fn currency_filter(&self) -> Option<&str> {
        non_blank(self.currency.as_deref())
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// A cached country row (one row per country name, case-insensitive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// A normalized and enriched record, ready to be upserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCountry {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
}

/// One currency entry as served by RestCountries v2.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawCurrency {
    pub code: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

/// Raw record from the country directory. Fields are optional because
/// validation happens after decoding, not during it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawCountry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<PopulationField>,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub currencies: Option<Vec<RawCurrency>>,
}

impl RawCountry {
    /// Code of the first listed currency; blank codes count as missing.
    pub fn first_currency_code(&self) -> Option<&str> {
        self.currencies
            .as_ref()?
            .first()?
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// The population value exactly as the directory served it.
/// Only JSON integers are accepted downstream; anything else is kept so
/// validation can report it instead of failing the whole decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PopulationField {
    Integer(i64),
    /// A JSON integer above `i64::MAX`, the widest value the table stores.
    OutOfRange,
    NotInteger,
}

impl<'de> Deserialize<'de> for PopulationField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
        struct PopulationVisitor;

        impl<'de> Visitor<'de> for PopulationVisitor {
            type Value = PopulationField;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a population value")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PopulationField::Integer(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(i64::try_from(v)
                    .map(PopulationField::Integer)
                    .unwrap_or(PopulationField::OutOfRange))
            }

            fn visit_f64<E>(self, _v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PopulationField::NotInteger)
            }

            fn visit_bool<E>(self, _v: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PopulationField::NotInteger)
            }

            fn visit_str<E>(self, _v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(PopulationField::NotInteger)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(PopulationField::NotInteger)
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(PopulationField::NotInteger)
            }
        }

        deserializer.deserialize_any(PopulationVisitor)
    }
}

/// Payload of the exchange-rate API (`/v6/latest/USD`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatesResponse {
    pub result: Option<String>,
    pub base_code: Option<String>,
    #[serde(rename = "error-type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

/// Row count and most recent refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Status {
    pub total_countries: u64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// Result of `POST /countries/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshSummary {
    pub message: String,
    pub total_countries: u64,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Plain `{"message": ...}` reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_param_falls_back_to_name() {
        assert_eq!(SortOrder::from_param(Some("gdp_desc")), SortOrder::GdpDesc);
        assert_eq!(
            SortOrder::from_param(Some("population_asc")),
            SortOrder::PopulationAsc
        );
        assert_eq!(SortOrder::from_param(Some("bogus")), SortOrder::Name);
        assert_eq!(SortOrder::from_param(None), SortOrder::Name);
    }

    #[test]
    fn population_keeps_non_integers_for_validation() {
        let raw: RawCountry =
            serde_json::from_str(r#"{"name":"X","population":12.5}"#).unwrap();
        assert_eq!(raw.population, Some(PopulationField::NotInteger));

        let raw: RawCountry = serde_json::from_str(r#"{"name":"X","population":"12"}"#).unwrap();
        assert_eq!(raw.population, Some(PopulationField::NotInteger));

        let raw: RawCountry = serde_json::from_str(r#"{"name":"X","population":null}"#).unwrap();
        assert_eq!(raw.population, None);

        let raw: RawCountry = serde_json::from_str(r#"{"name":"X","population":-3}"#).unwrap();
        assert_eq!(raw.population, Some(PopulationField::Integer(-3)));

        let raw: RawCountry =
            serde_json::from_str(r#"{"name":"X","population":9223372036854775808}"#).unwrap();
        assert_eq!(raw.population, Some(PopulationField::OutOfRange));
    }

    #[test]
    fn blank_first_currency_is_missing() {
        let raw: RawCountry = serde_json::from_str(
            r#"{"name":"X","currencies":[{"code":"  "},{"code":"EUR"}]}"#,
        )
        .unwrap();
        assert_eq!(raw.first_currency_code(), None);
    }
}
