//! Catalog assembly tests.
//!
//! Tests verify:
//! - Building a catalog from a JSON catalog file
//! - Failing sources are skipped without affecting the others
//! - Aggregate reload and dispose

use std::collections::BTreeSet;
use std::sync::Arc;

use sdi_catalog::backend::{BackendRegistry, VectorBackend};
use sdi_catalog::config::{CatalogConfig, ProviderConfig};
use sdi_catalog::error::CatalogError;
use sdi_catalog::name::Name;
use sdi_catalog::service::{Catalog, ProviderService};

use super::test_utils::{qn, SourceTree};

fn catalog_file(tree: &SourceTree, json: &str) -> CatalogConfig {
    tree.write("catalog.json", json.as_bytes());
    CatalogConfig::load(&tree.join("catalog.json")).unwrap()
}

#[test]
fn test_catalog_from_file() {
    let data = SourceTree::new();
    data.shapefile("vectors/roads.shp")
        .shapefile("vectors/rivers.shp")
        .raster("dem/elevation.tif", 32, 32);

    let config = catalog_file(
        &data,
        &format!(
            r#"{{
                "sources": [
                    {{
                        "kind": "vector",
                        "id": "base",
                        "root": "{vectors}",
                        "namespace": "topo",
                        "layers": {{ "roads": {{ "styles": ["line", "casing"] }} }}
                    }},
                    {{ "kind": "raster", "id": "dem", "root": "{dem}", "namespace": "-" }}
                ]
            }}"#,
            vectors = data.join("vectors").display(),
            dem = data.join("dem").display(),
        ),
    );

    let catalog = Catalog::from_config(&config, BackendRegistry::with_defaults());

    assert_eq!(
        catalog.keys(),
        BTreeSet::from([
            qn("topo", "roads"),
            qn("topo", "rivers"),
            Name::local("elevation"),
        ])
    );

    let roads = catalog.get(&qn("topo", "roads")).unwrap();
    assert_eq!(roads.provider(), "base");
    assert_eq!(roads.styles(), ["line", "casing"]);

    let elevation = catalog.get(&Name::local("elevation")).unwrap();
    assert_eq!(elevation.kind(), "raster");

    assert!(catalog.get(&qn("vector", "roads")).is_none());
}

#[test]
fn test_failing_sources_are_skipped() {
    let data = SourceTree::new();
    data.shapefile("vectors/roads.shp");

    let config = catalog_file(
        &data,
        &format!(
            r#"{{
                "sources": [
                    {{ "kind": "vector", "id": "missing", "root": "{missing}" }},
                    {{ "kind": "wms", "id": "remote", "root": "{vectors}" }},
                    {{ "kind": "vector", "id": "base", "root": "{vectors}" }}
                ]
            }}"#,
            missing = data.join("nowhere").display(),
            vectors = data.join("vectors").display(),
        ),
    );

    let catalog = Catalog::from_config(&config, BackendRegistry::with_defaults());

    let ids: Vec<_> = catalog
        .providers()
        .iter()
        .map(|p| p.id().to_string())
        .collect();
    assert_eq!(ids, vec!["base"]);
    assert!(catalog.provider("missing").is_none());
    assert!(catalog.get(&qn("vector", "roads")).is_some());
}

#[test]
fn test_catalog_file_errors() {
    let data = SourceTree::new();

    let missing = CatalogConfig::load(&data.join("absent.json"));
    assert!(matches!(missing, Err(CatalogError::CatalogFile { .. })));

    data.write("bad.json", b"{ \"sources\": [ { \"kind\": 1 } ] }");
    let malformed = CatalogConfig::load(&data.join("bad.json"));
    assert!(matches!(malformed, Err(CatalogError::CatalogFile { .. })));
}

#[test]
fn test_default_cache_capacity_applies_to_unset_sources() {
    let data = SourceTree::new();
    data.shapefile("a/x.shp").shapefile("b/y.shp");

    let config = catalog_file(
        &data,
        &format!(
            r#"{{
                "sources": [
                    {{ "kind": "vector", "id": "a", "root": "{a}" }},
                    {{ "kind": "vector", "id": "b", "root": "{b}", "cache_capacity": 7 }}
                ]
            }}"#,
            a = data.join("a").display(),
            b = data.join("b").display(),
        ),
    )
    .with_default_cache_capacity(2);

    let catalog = Catalog::from_config(&config, BackendRegistry::with_defaults());

    assert_eq!(catalog.provider("a").unwrap().cache_capacity(), 2);
    assert_eq!(catalog.provider("b").unwrap().cache_capacity(), 7);
}

#[test]
fn test_service_isolates_bad_config() {
    let data = SourceTree::new();
    data.shapefile("roads.shp");
    let service = ProviderService::new(Arc::new(VectorBackend::new()));

    assert!(service
        .create_provider(ProviderConfig::new("bad", data.join("nope")))
        .is_none());
    assert!(service
        .create_provider(ProviderConfig::new("good", data.path()))
        .is_some());

    assert_eq!(service.len(), 1);
    assert_eq!(service.keys(), BTreeSet::from([qn("vector", "roads")]));
}

#[test]
fn test_reload_all_and_dispose_all() {
    let first = SourceTree::new();
    let second = SourceTree::new();
    first.shapefile("roads.shp");
    second.raster("dem.tif", 4, 4);

    let catalog = Catalog::new(BackendRegistry::with_defaults());
    catalog
        .service("vector")
        .unwrap()
        .create_provider(ProviderConfig::new("v", first.path()));
    catalog
        .service("raster")
        .unwrap()
        .create_provider(ProviderConfig::new("r", second.path()));

    first.shapefile("rivers.shp");
    second.remove("dem.tif");
    assert!(catalog.reload_all().is_empty());

    assert_eq!(
        catalog.keys(),
        BTreeSet::from([qn("vector", "roads"), qn("vector", "rivers")])
    );

    let providers = catalog.providers();
    catalog.dispose_all();

    assert!(catalog.keys().is_empty());
    assert!(providers.iter().all(|p| p.is_disposed()));
}
