//! The refresh pipeline and the query operations behind every endpoint.
//!
//! Everything here is blocking (reqwest blocking client, rusqlite, plotters);
//! the HTTP layer runs it on the blocking pool.

use crate::api::CountrySource;
use crate::enrich::{self, GdpModel, Multiplier, RandomMultiplier};
use crate::error::{Result, ServiceError};
use crate::models::{Country, CountryQuery, Message, RefreshSummary, Status};
use crate::store::CountryStore;
use crate::summary::{self, SummaryData, TOP_N};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

pub struct CountryService {
    source: Box<dyn CountrySource>,
    store: CountryStore,
    gdp_model: GdpModel,
    multiplier: Mutex<Box<dyn Multiplier + Send>>,
    image_path: PathBuf,
    font_path: Option<PathBuf>,
    // One refresh at a time; readers are not blocked by it.
    refresh_lock: Mutex<()>,
}

impl CountryService {
    pub fn new(
        source: Box<dyn CountrySource>,
        store: CountryStore,
        image_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            store,
            gdp_model: GdpModel::default(),
            multiplier: Mutex::new(Box::new(RandomMultiplier)),
            image_path: image_path.into(),
            font_path: None,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_gdp_model(mut self, model: GdpModel) -> Self {
        self.gdp_model = model;
        self
    }

    /// Replace the random multiplier, e.g. with [`enrich::FixedMultiplier`].
    pub fn with_multiplier(mut self, m: impl Multiplier + Send + 'static) -> Self {
        self.multiplier = Mutex::new(Box::new(m));
        self
    }

    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn store(&self) -> &CountryStore {
        &self.store
    }

    /// Fetch, validate, enrich and upsert every country, then redraw the
    /// summary image. Nothing is written unless both sources answered and
    /// every record validated.
    pub fn refresh(&self) -> Result<RefreshSummary> {
        let _guard = self
            .refresh_lock
            .lock()
            .map_err(|_| ServiceError::Internal(anyhow::anyhow!("refresh lock poisoned")))?;
        let started = Instant::now();

        let raws = self.source.fetch_countries()?;
        let rates = self.source.fetch_rates()?;
        log::info!(
            "fetched {} countries and {} exchange rates",
            raws.len(),
            rates.len()
        );

        let records = {
            let mut m = self
                .multiplier
                .lock()
                .map_err(|_| ServiceError::Internal(anyhow::anyhow!("multiplier lock poisoned")))?;
            enrich::normalize_all(&raws, &rates, self.gdp_model, &mut **m)
                .map_err(ServiceError::Validation)?
        };

        let refreshed_at = Utc::now();
        let written = self.store.upsert_all(&records, refreshed_at)?;

        if let Err(e) = self.render_image() {
            log::warn!("summary image not generated: {e:#}");
        }

        let status = self.store.status()?;
        log::info!(
            "refresh stored {written} countries ({} total) in {:?}",
            status.total_countries,
            started.elapsed()
        );
        Ok(RefreshSummary {
            message: "Countries refreshed successfully".to_string(),
            total_countries: status.total_countries,
            last_refreshed_at: refreshed_at,
        })
    }

    /// Redraw the summary image from what is currently stored.
    pub fn render_image(&self) -> anyhow::Result<()> {
        let status = self.store.status()?;
        let top = self
            .store
            .top_by_gdp(TOP_N)?
            .into_iter()
            .filter_map(|c| c.estimated_gdp.map(|g| (c.name, g)))
            .collect();
        let data = SummaryData {
            total_countries: status.total_countries,
            last_refreshed_at: status.last_refreshed_at,
            top,
        };
        summary::render_summary(&data, &self.image_path, self.font_path.as_deref())
    }

    pub fn list(&self, query: &CountryQuery) -> Result<Vec<Country>> {
        self.store.list(query)
    }

    pub fn get(&self, name: &str) -> Result<Country> {
        self.store.get_by_name(name)?.ok_or(ServiceError::NotFound)
    }

    pub fn delete(&self, name: &str) -> Result<Message> {
        if !self.store.delete_by_name(name)? {
            return Err(ServiceError::NotFound);
        }
        log::info!("deleted country '{name}'");
        Ok(Message {
            message: format!("Country '{name}' deleted successfully"),
        })
    }

    pub fn status(&self) -> Result<Status> {
        self.store.status()
    }

    /// Path of the last generated image, if one exists.
    pub fn image_path(&self) -> Result<&Path> {
        if self.image_path.is_file() {
            Ok(&self.image_path)
        } else {
            Err(ServiceError::ImageNotFound)
        }
    }
}
