//! Runtime configuration from environment variables.
//!
//! | Variable            | Default                                  |
//! |---------------------|------------------------------------------|
//! | `DATABASE_URL`      | `countries.db` (`sqlite://…`, `:memory:`) |
//! | `HOST`              | `0.0.0.0`                                |
//! | `PORT`              | `8000`                                   |
//! | `COUNTRIES_API_URL` | RestCountries v2 `all` endpoint          |
//! | `EXCHANGE_API_URL`  | open.er-api.com `latest/USD`             |
//! | `CACHE_DIR`         | `cache`                                  |
//! | `FONT_PATH`         | DejaVu Sans                              |
//! | `GDP_MODEL`         | `rate_product`                           |
//! | `HTTP_TIMEOUT_SECS` | `30`                                     |

use crate::api::{DEFAULT_COUNTRIES_URL, DEFAULT_RATES_URL};
use crate::enrich::GdpModel;
use crate::summary::DEFAULT_FONT_PATH;
use anyhow::{Result, anyhow};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where the table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    Memory,
    File(PathBuf),
}

impl FromStr for Database {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let path = s
            .strip_prefix("sqlite://")
            .or_else(|| s.strip_prefix("sqlite:"))
            .unwrap_or(s);
        match path {
            "" => Err("empty database path".to_string()),
            ":memory:" => Ok(Database::Memory),
            p => Ok(Database::File(PathBuf::from(p))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: Database,
    pub host: String,
    pub port: u16,
    pub countries_url: String,
    pub rates_url: String,
    pub cache_dir: PathBuf,
    pub font_path: PathBuf,
    pub gdp_model: GdpModel,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Database::File(PathBuf::from("countries.db")),
            host: "0.0.0.0".into(),
            port: 8000,
            countries_url: DEFAULT_COUNTRIES_URL.into(),
            rates_url: DEFAULT_RATES_URL.into(),
            cache_dir: PathBuf::from("cache"),
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            gdp_model: GdpModel::default(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Ok(Self {
            database: try_load(&lookup, "DATABASE_URL", d.database)?,
            host: try_load(&lookup, "HOST", d.host)?,
            port: try_load(&lookup, "PORT", d.port)?,
            countries_url: try_load(&lookup, "COUNTRIES_API_URL", d.countries_url)?,
            rates_url: try_load(&lookup, "EXCHANGE_API_URL", d.rates_url)?,
            cache_dir: try_load(&lookup, "CACHE_DIR", d.cache_dir)?,
            font_path: try_load(&lookup, "FONT_PATH", d.font_path)?,
            gdp_model: try_load(&lookup, "GDP_MODEL", d.gdp_model)?,
            http_timeout: Duration::from_secs(try_load(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                d.http_timeout.as_secs(),
            )?),
        })
    }

    pub fn image_path(&self) -> PathBuf {
        self.cache_dir.join("summary.png")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => {
            log::debug!("{key} not set, using default");
            Ok(default)
        }
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} value '{raw}': {e}")),
    }
}
