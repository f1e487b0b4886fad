//! Synchronous clients for the two upstream sources:
//!
//! - **RestCountries v2** (`/v2/all?fields=...`): the country directory.
//! - **open.er-api.com** (`/v6/latest/USD`): one USD-based exchange-rate table.
//!
//! Both are reached through the [`CountrySource`] trait so the refresh pipeline can
//! be driven by a stub in tests.
//!
//! ### Notes
//! - Transient failures (network errors, 5xx) are retried with a short backoff;
//!   4xx responses fail immediately.
//! - Every failure is reported as [`ServiceError::ExternalUnavailable`] naming the
//!   source and URL, which the HTTP layer maps to `503`.
//! - The rate API signals errors in-band (`"result": "error"`); that is treated as
//!   unavailable too.
//!
//! Typical usage:
//! ```no_run
//! # use ccx_rs::api::{Client, CountrySource};
//! let client = Client::default();
//! let countries = client.fetch_countries()?;
//! let rates = client.fetch_rates()?;
//! # Ok::<(), ccx_rs::ServiceError>(())
//! ```
use crate::error::{Result, ServiceError};
use crate::models::{RatesResponse, RawCountry};
use anyhow::{Context, anyhow, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

pub const COUNTRIES_SOURCE: &str = "RestCountries API";
pub const RATES_SOURCE: &str = "Exchange Rate API";

/// Where refresh data comes from.
pub trait CountrySource: Send + Sync {
    /// All country records, undecoded beyond their wire shape.
    fn fetch_countries(&self) -> Result<Vec<RawCountry>>;

    /// Currency code -> units per USD.
    fn fetch_rates(&self) -> Result<HashMap<String, f64>>;
}

#[derive(Debug, Clone)]
pub struct Client {
    pub countries_url: String,
    pub rates_url: String,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(
            DEFAULT_COUNTRIES_URL,
            DEFAULT_RATES_URL,
            Duration::from_secs(30),
        )
        .expect("reqwest client build")
    }
}

impl Client {
    pub fn new(
        countries_url: impl Into<String>,
        rates_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout) // total request timeout
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(5))
            .user_agent(concat!("ccx_rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            countries_url: countries_url.into(),
            rates_url: rates_url.into(),
            http,
        })
    }

    // Small retry for transient failures (5xx / network errors)
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        with_retries(RETRY_DELAYS_MS, || match self.http.get(url).send() {
            Ok(r) if r.status().is_success() => {
                r.json().context("decode json").map_err(Attempt::Fatal)
            }
            Ok(r) if r.status().is_server_error() => {
                Err(Attempt::Transient(anyhow!("HTTP {}", r.status())))
            }
            Ok(r) => Err(Attempt::Fatal(anyhow!(
                "request failed with HTTP {}",
                r.status()
            ))),
            Err(e) => Err(Attempt::Transient(anyhow::Error::new(e).context("network error"))),
        })
        .with_context(|| format!("GET {url}"))
    }
}

/// Pauses between attempts; one more attempt than entries.
const RETRY_DELAYS_MS: &[u64] = &[100, 300];

enum Attempt {
    Transient(anyhow::Error),
    Fatal(anyhow::Error),
}

/// Run `op` until it succeeds, fails fatally, or the delays run out. No pause
/// follows the final attempt.
fn with_retries<T>(
    delays_ms: &[u64],
    mut op: impl FnMut() -> std::result::Result<T, Attempt>,
) -> anyhow::Result<T> {
    let mut delays = delays_ms.iter();
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(Attempt::Fatal(e)) => return Err(e),
            Err(Attempt::Transient(e)) => match delays.next() {
                Some(&ms) => {
                    log::debug!("request failed ({e:#}), retrying in {ms}ms");
                    std::thread::sleep(Duration::from_millis(ms));
                }
                None => {
                    return Err(e.context(format!(
                        "giving up after {} attempts",
                        delays_ms.len() + 1
                    )));
                }
            },
        }
    }
}

impl CountrySource for Client {
    fn fetch_countries(&self) -> Result<Vec<RawCountry>> {
        self.get_json::<Vec<RawCountry>>(&self.countries_url)
            .map_err(|cause| unavailable(COUNTRIES_SOURCE, &self.countries_url, cause))
    }

    fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
        self.get_json::<RatesResponse>(&self.rates_url)
            .and_then(rates_table)
            .map_err(|cause| unavailable(RATES_SOURCE, &self.rates_url, cause))
    }
}

/// Extract the rate table, surfacing in-band API errors.
pub fn rates_table(resp: RatesResponse) -> anyhow::Result<HashMap<String, f64>> {
    if resp.result.as_deref() == Some("error") {
        bail!(
            "exchange rate api error: {}",
            resp.error_type.as_deref().unwrap_or("unknown")
        );
    }
    Ok(resp.rates)
}

fn unavailable(source_name: &'static str, url: &str, cause: anyhow::Error) -> ServiceError {
    log::warn!("{source_name} unavailable: {cause:#}");
    ServiceError::ExternalUnavailable {
        source_name,
        url: url.to_string(),
        cause,
    }
}
