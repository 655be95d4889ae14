//! HTTP server layer for the catalog.
//!
//! Thin glue over [`Catalog`](crate::service::Catalog): protocol workers
//! resolve names through `/layers`, operators drive provider lifecycle
//! through `/providers`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /layers/{name}    POST /providers/{id}/reload        │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (requests, error codes)  │  │  (router, CORS, tracing)    │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    dispose_handler, health_handler, layer_handler, layers_handler, providers_handler,
    reload_handler, AppState, ErrorResponse, HealthResponse, LayersResponse, ProviderSummary,
    ProvidersResponse, ReloadResponse,
};
pub use routes::{create_router, RouterConfig};
