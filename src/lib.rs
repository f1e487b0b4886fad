//! ccx_rs
//!
//! Country Currency & Exchange cache: fetches country metadata from RestCountries,
//! enriches it with USD exchange rates, derives a rough GDP estimate, stores the
//! result in SQLite and serves it over HTTP. Pairs with the `ccx` CLI.
//!
//! ### Features
//! - One-shot refresh: fetch → validate → enrich → upsert, all-or-nothing
//! - Listing with region/currency filters and GDP/population sort orders
//! - Case-insensitive lookup and delete by country name
//! - A PNG summary (row count, last refresh, top 5 by estimated GDP)
//!
//! ### Example
//! ```no_run
//! use ccx_rs::{Client, CountryService, CountryStore};
//! use ccx_rs::models::CountryQuery;
//!
//! let store = CountryStore::open("countries.db")?;
//! let service = CountryService::new(Box::new(Client::default()), store, "cache/summary.png");
//! let summary = service.refresh()?;
//! println!("{} countries", summary.total_countries);
//!
//! let query = CountryQuery { region: Some("Africa".into()), sort: Some("gdp_desc".into()), ..Default::default() };
//! for c in service.list(&query)? {
//!     println!("{} {:?}", c.name, c.estimated_gdp);
//! }
//! # Ok::<(), ccx_rs::ServiceError>(())
//! ```

pub mod api;
pub mod config;
pub mod enrich;
pub mod error;
pub mod models;
pub mod server;
pub mod service;
pub mod store;
pub mod summary;

pub use api::{Client, CountrySource};
pub use config::Config;
pub use error::ServiceError;
pub use service::CountryService;
pub use store::CountryStore;
