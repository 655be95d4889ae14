//! HTTP request handlers for the catalog API.
//!
//! Catalog operations are synchronous and may block on file I/O, so every
//! handler that touches the catalog runs its work on the blocking pool.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /layers` - List every resolvable layer name
//! - `GET /layers/{name}` - Resolve a layer and describe it
//! - `GET /providers` - List live providers
//! - `POST /providers/{id}/reload` - Rescan one provider
//! - `DELETE /providers/{id}` - Dispose one provider

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, CatalogError};
use crate::name::Name;
use crate::provider::{LayerDetails, Provider};
use crate::service::Catalog;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the catalog.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "disposed")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Response from the layers list endpoint.
#[derive(Debug, Serialize)]
pub struct LayersResponse {
    /// Layer names in `namespace:local` form, sorted
    pub layers: Vec<Name>,
}

/// Summary of one live provider.
#[derive(Debug, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub kind: String,
    pub root: String,
    pub namespace: Option<String>,
    pub layers: usize,
    pub cached: usize,
    pub cache_capacity: usize,
    pub disposed: bool,
}

impl From<&Provider> for ProviderSummary {
    fn from(provider: &Provider) -> Self {
        Self {
            id: provider.id().to_string(),
            kind: provider.kind().to_string(),
            root: provider.root().display().to_string(),
            namespace: provider.namespace().map(str::to_string),
            layers: provider.keys().len(),
            cached: provider.cached_count(),
            cache_capacity: provider.cache_capacity(),
            disposed: provider.is_disposed(),
        }
    }
}

/// Response from the providers list endpoint.
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderSummary>,
}

/// Response from the reload endpoint.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub id: String,
    pub layers: usize,
    pub warnings: Vec<String>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ApiError to HTTP response.
///
/// 5xx errors are logged at ERROR, 404s at DEBUG, other 4xx at WARN.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::LayerNotFound { .. } | ApiError::ProviderNotFound { .. } => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::InvalidName(_) => (StatusCode::BAD_REQUEST, "invalid_name"),
            ApiError::Catalog(CatalogError::Disposed { .. }) => (StatusCode::CONFLICT, "disposed"),
            ApiError::Catalog(CatalogError::Ownership { .. }) => {
                (StatusCode::CONFLICT, "not_owned")
            }
            ApiError::Catalog(CatalogError::UnknownKind(_)) => {
                (StatusCode::BAD_REQUEST, "unknown_kind")
            }
            ApiError::Catalog(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

/// Run a catalog operation on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle layer list requests.
///
/// `GET /layers`
pub async fn layers_handler(State(state): State<AppState>) -> Result<Json<LayersResponse>, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let layers: Vec<Name> = blocking(move || catalog.keys().into_iter().collect()).await?;

    Ok(Json(LayersResponse { layers }))
}

/// Handle single-layer requests.
///
/// `GET /layers/{name}` where `name` is `namespace:local` or `local`.
/// Layers that are not indexed, or whose dataset cannot be opened, are 404.
pub async fn layer_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LayerDetails>, ApiError> {
    let parsed: Name = name.parse().map_err(ApiError::InvalidName)?;

    let catalog = Arc::clone(&state.catalog);
    let lookup = parsed.clone();
    let details = blocking(move || catalog.get(&lookup)).await?;

    details.map(Json).ok_or(ApiError::LayerNotFound {
        name: parsed.to_string(),
    })
}

/// Handle provider list requests.
///
/// `GET /providers`
pub async fn providers_handler(
    State(state): State<AppState>,
) -> Result<Json<ProvidersResponse>, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let providers: Vec<ProviderSummary> = blocking(move || {
        catalog
            .providers()
            .iter()
            .map(|p| ProviderSummary::from(p.as_ref()))
            .collect()
    })
    .await?;

    Ok(Json(ProvidersResponse { providers }))
}

/// Handle provider reload requests.
///
/// `POST /providers/{id}/reload`
pub async fn reload_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let lookup = id.clone();
    let outcome = blocking(move || catalog.reload_provider(&lookup)).await?;

    let summary = outcome.ok_or_else(|| ApiError::ProviderNotFound { id: id.clone() })??;

    info!(provider = %id, layers = summary.layers, "Reload requested over HTTP");

    Ok(Json(ReloadResponse {
        id,
        layers: summary.layers,
        warnings: summary.warnings.iter().map(ToString::to_string).collect(),
    }))
}

/// Handle provider dispose requests.
///
/// `DELETE /providers/{id}`
pub async fn dispose_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let lookup = id.clone();
    let disposed = blocking(move || catalog.dispose_provider(&lookup)).await??;

    if disposed {
        info!(provider = %id, "Provider disposed over HTTP");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ProviderNotFound { id })
    }
}

// =============================================================================
// Tests
// =============================================================================
