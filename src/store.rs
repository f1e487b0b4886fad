//! SQLite-backed country cache.
//!
//! One table, `countries`, keyed by a case-insensitive unique `name`. Refreshes
//! upsert in a single transaction so a failed batch leaves the previous
//! contents untouched.
//!
//! SQLite's built-in `NOCASE` only folds ASCII, so every connection registers
//! [`UNICASE`], which compares Unicode lowercase forms ("Åland Islands" equals
//! "åland islands").

use crate::error::{Result, ServiceError};
use crate::models::{Country, CountryQuery, NewCountry, SortOrder, Status};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Name of the case-insensitive collation registered on every connection.
pub const UNICASE: &str = "UNICASE";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS countries (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    name              TEXT    NOT NULL UNIQUE COLLATE UNICASE,
    capital           TEXT,
    region            TEXT,
    population        INTEGER NOT NULL,
    currency_code     TEXT,
    exchange_rate     REAL,
    estimated_gdp     REAL,
    flag_url          TEXT,
    last_refreshed_at TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_countries_region ON countries(region COLLATE UNICASE);
CREATE INDEX IF NOT EXISTS idx_countries_currency ON countries(currency_code COLLATE UNICASE);
";

const COLUMNS: &str = "id, name, capital, region, population, currency_code, \
                       exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

pub struct CountryStore {
    conn: Mutex<Connection>,
}

impl CountryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ServiceError::Internal(anyhow::anyhow!(
                    "create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.create_collation(UNICASE, unicase_cmp)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ServiceError::Internal(anyhow::anyhow!("country store lock poisoned")))
    }

    /// Insert or update every record, stamping all of them with `refreshed_at`.
    /// A name that matches an existing row case-insensitively updates that row
    /// and keeps its stored spelling.
    pub fn upsert_all(&self, records: &[NewCountry], refreshed_at: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO countries (name, capital, region, population, currency_code,
                                        exchange_rate, estimated_gdp, flag_url, last_refreshed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(name) DO UPDATE SET
                    capital = excluded.capital,
                    region = excluded.region,
                    population = excluded.population,
                    currency_code = excluded.currency_code,
                    exchange_rate = excluded.exchange_rate,
                    estimated_gdp = excluded.estimated_gdp,
                    flag_url = excluded.flag_url,
                    last_refreshed_at = excluded.last_refreshed_at",
            )?;
            for c in records {
                stmt.execute(params![
                    c.name,
                    c.capital,
                    c.region,
                    c.population,
                    c.currency_code,
                    c.exchange_rate,
                    c.estimated_gdp,
                    c.flag_url,
                    refreshed_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn list(&self, query: &CountryQuery) -> Result<Vec<Country>> {
        let mut sql = format!("SELECT {COLUMNS} FROM countries WHERE 1 = 1");
        let mut args: Vec<String> = Vec::new();
        if let Some(region) = query.region_filter() {
            sql.push_str(" AND region = ? COLLATE UNICASE");
            args.push(region.to_string());
        }
        if let Some(currency) = query.currency_filter() {
            sql.push_str(" AND currency_code = ? COLLATE UNICASE");
            args.push(currency.to_string());
        }
        sql.push_str(order_clause(query.sort_order()));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_country)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<Country>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {COLUMNS} FROM countries WHERE name = ?1"))?;
        Ok(stmt.query_row(params![name.trim()], row_to_country).optional()?)
    }

    /// `true` when a row was removed.
    pub fn delete_by_name(&self, name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let n = conn.execute("DELETE FROM countries WHERE name = ?1", params![name.trim()])?;
        Ok(n > 0)
    }

    pub fn status(&self) -> Result<Status> {
        let conn = self.lock()?;
        let (total, last): (i64, Option<DateTime<Utc>>) = conn.query_row(
            "SELECT COUNT(*), MAX(last_refreshed_at) FROM countries",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(Status {
            total_countries: total.max(0) as u64,
            last_refreshed_at: last,
        })
    }

    /// Highest estimates first; rows without an estimate are skipped.
    pub fn top_by_gdp(&self, n: usize) -> Result<Vec<Country>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM countries
             WHERE estimated_gdp IS NOT NULL
             ORDER BY estimated_gdp DESC, name
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![n as i64], row_to_country)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn unicase_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

// NULL estimates sort last in both directions; ties break by name.
fn order_clause(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::GdpDesc => " ORDER BY estimated_gdp IS NULL, estimated_gdp DESC, name",
        SortOrder::GdpAsc => " ORDER BY estimated_gdp IS NULL, estimated_gdp ASC, name",
        SortOrder::PopulationDesc => " ORDER BY population DESC, name",
        SortOrder::PopulationAsc => " ORDER BY population ASC, name",
        SortOrder::Name => " ORDER BY name",
    }
}

fn row_to_country(r: &Row<'_>) -> rusqlite::Result<Country> {
    Ok(Country {
        id: r.get(0)?,
        name: r.get(1)?,
        capital: r.get(2)?,
        region: r.get(3)?,
        population: r.get(4)?,
        currency_code: r.get(5)?,
        exchange_rate: r.get(6)?,
        estimated_gdp: r.get(7)?,
        flag_url: r.get(8)?,
        last_refreshed_at: r.get(9)?,
    })
}
