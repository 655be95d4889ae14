//! Provider tests over real files on disk.
//!
//! Tests verify:
//! - Index contents after construction (namespace policy, selection, masks)
//! - Cache-hit idempotence and LRU eviction
//! - Cached handles always belong to the requested file
//! - Reload picks up added and removed files
//! - Dispose makes the provider unusable

use std::collections::BTreeSet;
use std::sync::Arc;

use sdi_catalog::backend::{RasterBackend, VectorBackend};
use sdi_catalog::config::{LayerConfig, ProviderConfig};
use sdi_catalog::error::{CatalogError, ScanWarning};
use sdi_catalog::name::{Name, NO_NAMESPACE};
use sdi_catalog::provider::Provider;
use sdi_catalog::scan::{LayerSelection, SourceScanner, SuffixMask};

use super::test_utils::{qn, CountingBackend, SourceTree};

fn vector_d() -> Arc<CountingBackend<VectorBackend>> {
    CountingBackend::new(VectorBackend::with_default_namespace("D"))
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_vector_root_default_namespace() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp").shapefile("rivers.shp");

    let provider = Provider::new(ProviderConfig::new("base", tree.path()), vector_d()).unwrap();

    assert_eq!(
        provider.keys(),
        BTreeSet::from([qn("D", "roads"), qn("D", "rivers")])
    );

    let roads = provider.get(&qn("D", "roads")).unwrap().unwrap();
    assert_eq!(roads.name(), &qn("D", "roads"));
    assert!(roads.styles().is_empty());
    assert_eq!(roads.dataset().describe()["format"], "shapefile");
}

#[test]
fn test_raster_root_without_namespace() {
    let tree = SourceTree::new();
    tree.raster("elevation.tif", 256, 256);

    let config = ProviderConfig::new("dem", tree.path()).with_namespace(NO_NAMESPACE);
    let provider = Provider::new(config, Arc::new(RasterBackend::new())).unwrap();

    assert_eq!(provider.keys(), BTreeSet::from([Name::local("elevation")]));
    assert_eq!(provider.namespace(), None);

    let elevation = provider.get(&Name::local("elevation")).unwrap().unwrap();
    assert_eq!(elevation.dataset().describe()["width"], 256);
}

#[test]
fn test_missing_root_fails() {
    let tree = SourceTree::new();
    let config = ProviderConfig::new("gone", tree.join("does/not/exist"));

    let result = Provider::new(config, vector_d());
    assert!(matches!(result, Err(CatalogError::Configuration { .. })));
}

#[test]
fn test_name_collision_keeps_one_entry() {
    let tree = SourceTree::new();
    tree.shapefile("north/lake.shp").shapefile("south/lake.shp");

    let provider = Provider::new(ProviderConfig::new("lakes", tree.path()), vector_d()).unwrap();
    assert_eq!(provider.keys(), BTreeSet::from([qn("D", "lake")]));

    let summary = provider.reload().unwrap();
    assert_eq!(summary.layers, 1);
    assert!(matches!(
        summary.warnings.as_slice(),
        [ScanWarning::Collision { name, .. }] if *name == qn("D", "lake")
    ));
}

#[test]
fn test_mask_ignores_other_files() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp")
        .write("roads.dbf", b"attributes")
        .write("roads.prj", b"GEOGCS")
        .raster("dem.tif", 8, 8)
        .shapefile("UPPER.SHP");

    let provider = Provider::new(ProviderConfig::new("base", tree.path()), vector_d()).unwrap();

    assert_eq!(
        provider.keys(),
        BTreeSet::from([qn("D", "roads"), qn("D", "UPPER")])
    );
}

#[test]
fn test_include_exclude_selection() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp")
        .shapefile("rivers.shp")
        .shapefile("scratch.shp");

    let excluded = Provider::new(
        ProviderConfig::new("a", tree.path()).with_exclude(["scratch"]),
        vector_d(),
    )
    .unwrap();
    assert_eq!(
        excluded.keys(),
        BTreeSet::from([qn("D", "roads"), qn("D", "rivers")])
    );

    let included = Provider::new(
        ProviderConfig::new("b", tree.path())
            .with_include(["roads", "scratch"])
            .with_exclude(["scratch"]),
        vector_d(),
    )
    .unwrap();
    assert_eq!(included.keys(), BTreeSet::from([qn("D", "roads")]));

    let nothing = Provider::new(
        ProviderConfig::new("c", tree.path()).with_load_all(false),
        vector_d(),
    )
    .unwrap();
    assert!(nothing.keys().is_empty());
}

#[test]
fn test_scanner_counts() {
    let tree = SourceTree::new();
    tree.shapefile("a.shp").shapefile("b.shp").shapefile("c.shp");

    let selection = LayerSelection::from_config(
        &ProviderConfig::new("p", tree.path()).with_exclude(["b"]),
    );
    let report = SourceScanner::scan(tree.path(), &SuffixMask::new(["shp"]), None, &selection);

    assert_eq!(report.matched, 3);
    assert_eq!(report.filtered, 1);
    assert_eq!(report.index.len(), 2);
    assert!(report.warnings.is_empty());
}

// =============================================================================
// Get and Cache
// =============================================================================

#[test]
fn test_repeated_get_returns_same_handle() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");
    let backend = vector_d();
    let provider = Provider::new(ProviderConfig::new("base", tree.path()), backend.clone()).unwrap();

    let first = provider.get(&qn("D", "roads")).unwrap().unwrap();
    let second = provider.get(&qn("D", "roads")).unwrap().unwrap();

    assert!(Arc::ptr_eq(first.dataset(), second.dataset()));
    assert_eq!(backend.opens(), 1);
}

#[test]
fn test_lru_eviction() {
    let tree = SourceTree::new();
    for name in ["a", "b", "c", "d"] {
        tree.shapefile(&format!("{}.shp", name));
    }
    let backend = vector_d();
    let config = ProviderConfig::new("base", tree.path()).with_cache_capacity(3);
    let provider = Provider::new(config, backend.clone()).unwrap();

    for name in ["a", "b", "c"] {
        provider.get(&qn("D", name)).unwrap().unwrap();
    }
    // Touch "a" so "b" becomes least recently used
    provider.get(&qn("D", "a")).unwrap().unwrap();
    provider.get(&qn("D", "d")).unwrap().unwrap();

    assert_eq!(provider.cached_count(), 3);
    assert_eq!(backend.opens(), 4);
    assert_eq!(backend.closes(), 1);

    // "a" is still cached, "b" is not
    provider.get(&qn("D", "a")).unwrap().unwrap();
    assert_eq!(backend.opens(), 4);
    provider.get(&qn("D", "b")).unwrap().unwrap();
    assert_eq!(backend.opens(), 5);
}

#[test]
fn test_corrupt_file_is_not_found() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp").write("broken.shp", b"definitely not a shapefile");
    let provider = Provider::new(ProviderConfig::new("base", tree.path()), vector_d()).unwrap();

    assert!(provider.contains(&qn("D", "broken")));
    assert!(provider.get(&qn("D", "broken")).unwrap().is_none());
    assert!(provider.get(&qn("D", "roads")).unwrap().is_some());
    assert_eq!(provider.cached_count(), 1);
}

#[test]
fn test_raster_document_name_is_canonical() {
    let tree = SourceTree::new();
    tree.raster_named("tile_0042.tif", "srtm_alps");
    let backend = CountingBackend::new(RasterBackend::new());
    let provider = Provider::new(ProviderConfig::new("dem", tree.path()), backend.clone()).unwrap();

    assert_eq!(provider.keys(), BTreeSet::from([qn("raster", "tile_0042")]));

    let first = provider.get(&qn("raster", "tile_0042")).unwrap().unwrap();
    assert_eq!(first.name(), &qn("raster", "srtm_alps"));

    let second = provider.get(&qn("raster", "tile_0042")).unwrap().unwrap();
    assert!(Arc::ptr_eq(first.dataset(), second.dataset()));
    assert_eq!(backend.opens(), 1);
}

#[test]
fn test_shared_document_name_resolves_each_file() {
    let tree = SourceTree::new();
    tree.raster_named("a.tif", "shared").raster_named("b.tif", "shared");
    let backend = CountingBackend::new(RasterBackend::new());
    let provider = Provider::new(ProviderConfig::new("dem", tree.path()), backend.clone()).unwrap();

    let a = provider.get(&qn("raster", "a")).unwrap().unwrap();
    assert_eq!(a.dataset().locator().path(), tree.join("a.tif"));

    let b = provider.get(&qn("raster", "b")).unwrap().unwrap();
    assert_eq!(b.dataset().locator().path(), tree.join("b.tif"));

    let a_again = provider.get(&qn("raster", "a")).unwrap().unwrap();
    assert_eq!(a_again.dataset().locator().path(), tree.join("a.tif"));
    assert_eq!(a_again.name(), &qn("raster", "shared"));
    assert_eq!(backend.opens(), 3);
}

#[test]
fn test_document_name_does_not_shadow_other_file() {
    let tree = SourceTree::new();
    tree.raster_named("y.tif", "x").raster("x.tif", 16, 16);
    let backend = CountingBackend::new(RasterBackend::new());
    let provider = Provider::new(ProviderConfig::new("dem", tree.path()), backend.clone()).unwrap();

    let y = provider.get(&qn("raster", "y")).unwrap().unwrap();
    assert_eq!(y.name(), &qn("raster", "x"));
    assert_eq!(y.dataset().locator().path(), tree.join("y.tif"));

    let x = provider.get(&qn("raster", "x")).unwrap().unwrap();
    assert_eq!(x.dataset().locator().path(), tree.join("x.tif"));

    let x_again = provider.get(&qn("raster", "x")).unwrap().unwrap();
    assert!(Arc::ptr_eq(x.dataset(), x_again.dataset()));
    assert_eq!(backend.opens(), 2);
}

#[test]
fn test_layer_metadata() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp").shapefile("rivers.shp");
    let config = ProviderConfig::new("base", tree.path()).with_layer(
        "roads",
        LayerConfig {
            styles: vec!["line".to_string()],
            time_field: None,
            elevation_field: Some("z".to_string()),
        },
    );
    let provider = Provider::new(config, vector_d()).unwrap();

    let roads = provider.get(&qn("D", "roads")).unwrap().unwrap();
    assert_eq!(roads.styles(), ["line"]);
    assert_eq!(roads.metadata().elevation_field.as_deref(), Some("z"));

    let rivers = provider.get(&qn("D", "rivers")).unwrap().unwrap();
    assert!(rivers.styles().is_empty());
}

// =============================================================================
// Reload and Dispose
// =============================================================================

#[test]
fn test_reload_sees_new_file() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");
    let provider = Provider::new(ProviderConfig::new("base", tree.path()), vector_d()).unwrap();
    assert!(provider.get(&qn("D", "rivers")).unwrap().is_none());

    tree.shapefile("nested/rivers.shp");
    provider.reload().unwrap();

    assert!(provider.keys().contains(&qn("D", "rivers")));
    assert!(provider.get(&qn("D", "rivers")).unwrap().is_some());
}

#[test]
fn test_reload_forgets_removed_file() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp").shapefile("rivers.shp");
    let backend = vector_d();
    let provider = Provider::new(ProviderConfig::new("base", tree.path()), backend.clone()).unwrap();
    provider.get(&qn("D", "roads")).unwrap().unwrap();

    tree.remove("roads.shp");
    provider.reload().unwrap();

    assert!(provider.get(&qn("D", "roads")).unwrap().is_none());
    assert_eq!(provider.cached_count(), 0);
    assert_eq!(backend.closes(), 1);
}

#[test]
fn test_dispose_blocks_further_use() {
    let tree = SourceTree::new();
    tree.shapefile("roads.shp");
    let backend = vector_d();
    let provider = Provider::new(ProviderConfig::new("base", tree.path()), backend.clone()).unwrap();
    let held = provider.get(&qn("D", "roads")).unwrap().unwrap();

    provider.dispose();

    assert!(provider.keys().is_empty());
    assert!(!provider.contains(&qn("D", "roads")));
    assert!(matches!(
        provider.get(&qn("D", "roads")),
        Err(CatalogError::Disposed { .. })
    ));
    assert!(matches!(provider.reload(), Err(CatalogError::Disposed { .. })));
    assert_eq!(backend.closes(), 1);

    // Details handed out earlier stay readable
    assert_eq!(held.dataset().identifier(), "roads");
}
