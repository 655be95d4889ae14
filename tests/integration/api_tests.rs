//! API integration tests for layer resolution and provider management.
//!
//! Tests verify:
//! - Layer listing and resolution over HTTP
//! - Error cases (unknown layer, unreadable dataset, malformed name)
//! - Provider reload and dispose endpoints

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use sdi_catalog::backend::BackendRegistry;
use sdi_catalog::config::ProviderConfig;
use sdi_catalog::service::Catalog;
use sdi_catalog::{create_router, RouterConfig};

use super::test_utils::SourceTree;

fn catalog_over(tree: &SourceTree) -> Arc<Catalog> {
    let catalog = Catalog::new(BackendRegistry::with_defaults());
    catalog
        .service("vector")
        .unwrap()
        .create_provider(ProviderConfig::new("base", tree.path()).with_namespace("topo"));
    Arc::new(catalog)
}

fn router(catalog: Arc<Catalog>) -> Router {
    create_router(catalog, RouterConfig::new().with_tracing(false))
}

async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let tree = SourceTree::new();
    let (status, json) = send(router(catalog_over(&tree)), Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

// =============================================================================
// Layers
// =============================================================================

#[tokio::test]
async fn test_list_layers() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp").shapefile("rivers.shp");

    let (status, json) = send(router(catalog_over(&tree)), Method::GET, "/layers").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["layers"], serde_json::json!(["topo:rivers", "topo:roads"]));
}

#[tokio::test]
async fn test_get_layer() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");

    let (status, json) = send(router(catalog_over(&tree)), Method::GET, "/layers/topo:roads").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "topo:roads");
    assert_eq!(json["provider"], "base");
    assert_eq!(json["kind"], "vector");
    assert_eq!(json["metadata"]["styles"], serde_json::json!([]));
    assert_eq!(json["dataset"]["format"], "shapefile");
    assert_eq!(json["dataset"]["shape_type"], "polygon");
}

#[tokio::test]
async fn test_get_layer_namespace_with_separator() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");
    let catalog = Catalog::new(BackendRegistry::with_defaults());
    catalog
        .service("vector")
        .unwrap()
        .create_provider(ProviderConfig::new("base", tree.path()).with_namespace("urn:sdi:topo"));

    let (status, json) = send(
        router(Arc::new(catalog)),
        Method::GET,
        "/layers/urn:sdi:topo:roads",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "urn:sdi:topo:roads");
}

#[tokio::test]
async fn test_get_unknown_layer() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");

    let (status, json) = send(router(catalog_over(&tree)), Method::GET, "/layers/topo:lakes").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_get_unreadable_layer_is_not_found() {
    let tree = SourceTree::new();
    tree.write("broken.shp", b"garbage");

    let (status, json) = send(router(catalog_over(&tree)), Method::GET, "/layers/topo:broken").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_get_malformed_name() {
    let tree = SourceTree::new();

    let (status, json) = send(router(catalog_over(&tree)), Method::GET, "/layers/topo:").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_name");
}

// =============================================================================
// Providers
// =============================================================================

#[tokio::test]
async fn test_list_providers() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");
    let catalog = catalog_over(&tree);
    catalog.get(&"topo:roads".parse().unwrap()).unwrap();

    let (status, json) = send(router(catalog), Method::GET, "/providers").await;

    assert_eq!(status, StatusCode::OK);
    let providers = json["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0]["id"], "base");
    assert_eq!(providers[0]["kind"], "vector");
    assert_eq!(providers[0]["namespace"], "topo");
    assert_eq!(providers[0]["layers"], 1);
    assert_eq!(providers[0]["cached"], 1);
    assert_eq!(providers[0]["disposed"], false);
}

#[tokio::test]
async fn test_reload_provider() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");
    let catalog = catalog_over(&tree);

    tree.shapefile("rivers.shp");
    let (status, json) = send(router(catalog.clone()), Method::POST, "/providers/base/reload").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "base");
    assert_eq!(json["layers"], 2);
    assert_eq!(json["warnings"], serde_json::json!([]));

    let (status, _) = send(router(catalog), Method::GET, "/layers/topo:rivers").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reload_unknown_provider() {
    let tree = SourceTree::new();

    let (status, json) = send(
        router(catalog_over(&tree)),
        Method::POST,
        "/providers/ghost/reload",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_dispose_provider() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");
    let catalog = catalog_over(&tree);

    let (status, json) = send(router(catalog.clone()), Method::DELETE, "/providers/base").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(json.is_null());

    let (status, json) = send(router(catalog.clone()), Method::GET, "/layers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["layers"], serde_json::json!([]));

    let (status, _) = send(router(catalog.clone()), Method::GET, "/layers/topo:roads").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(router(catalog), Method::DELETE, "/providers/base").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
