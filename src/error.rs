//! Error type shared by the service layer, the CLI and the HTTP surface.

use std::collections::BTreeMap;
use thiserror::Error;

/// Field name -> problem, e.g. `"population" -> "is required"`.
pub type ValidationErrors = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("Country not found")]
    NotFound,

    #[error("Summary image not found")]
    ImageNotFound,

    #[error("External data source unavailable")]
    ExternalUnavailable {
        source_name: &'static str,
        url: String,
        #[source]
        cause: anyhow::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Human-readable details for the response body, when there are any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServiceError::Validation(fields) => serde_json::to_value(fields).ok(),
            ServiceError::ExternalUnavailable {
                source_name, url, ..
            } => Some(serde_json::Value::String(format!(
                "Could not fetch data from {source_name} ({url})"
            ))),
            _ => None,
        }
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
