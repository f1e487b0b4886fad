//! HTTP surface (axum).
//!
//! Handlers are thin: each one moves the blocking [`CountryService`] call onto
//! tokio's blocking pool and maps [`ServiceError`] to a status code and a JSON
//! `{"error", "details"}` body.

use crate::error::ServiceError;
use crate::models::{CountryQuery, Message};
use crate::service::CountryService;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;

pub type AppState = Arc<CountryService>;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound | ServiceError::ImageNotFound => StatusCode::NOT_FOUND,
            ServiceError::ExternalUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match (&self, self.details()) {
            (ServiceError::Database(_) | ServiceError::Internal(_), _) => {
                log::error!("request failed: {self:#}");
                json!({ "error": "Internal server error" })
            }
            (_, Some(details)) => json!({ "error": self.to_string(), "details": details }),
            (_, None) => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Run a blocking service call off the async executor.
async fn blocking<T, F>(state: AppState, f: F) -> Result<T, ServiceError>
where
    F: FnOnce(&CountryService) -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("blocking task failed: {e}")))?
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/favicon.ico", get(favicon))
        .route("/status", get(status))
        .route("/countries", get(list_countries))
        .route("/countries/refresh", post(refresh))
        .route("/countries/image", get(summary_image))
        .route("/countries/{name}", get(get_country).delete(delete_country))
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Country Currency & Exchange API",
        "endpoints": {
            "POST /countries/refresh": "Refresh country data from external APIs",
            "GET /countries": "Get all countries (supports ?region=, ?currency=, ?sort=)",
            "GET /countries/{name}": "Get a single country by name",
            "DELETE /countries/{name}": "Delete a country",
            "GET /status": "Get API status",
            "GET /countries/image": "Get summary image"
        }
    }))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn refresh(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let summary = blocking(state, |svc| svc.refresh()).await?;
    Ok(Json(summary).into_response())
}

async fn list_countries(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> Result<Response, ServiceError> {
    let countries = blocking(state, move |svc| svc.list(&query)).await?;
    Ok(Json(countries).into_response())
}

async fn get_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ServiceError> {
    let country = blocking(state, move |svc| svc.get(&name)).await?;
    Ok(Json(country).into_response())
}

async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Message>, ServiceError> {
    Ok(Json(blocking(state, move |svc| svc.delete(&name)).await?))
}

async fn status(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let status = blocking(state, |svc| svc.status()).await?;
    Ok(Json(status).into_response())
}

async fn summary_image(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let path = state.image_path()?.to_path_buf();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ServiceError::ImageNotFound)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("shutting down");
        })
        .await?;
    Ok(())
}
