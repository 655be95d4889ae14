//! SDI Catalog - named-resource catalog server.
//!
//! This binary loads the catalog file, builds one provider per source and
//! serves the catalog over HTTP.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sdi_catalog::{
    config::{CatalogConfig, CheckConfig, Cli, Command, ServeConfig},
    server::{create_router, RouterConfig},
    BackendRegistry, Catalog,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let catalog_config = match CatalogConfig::load(&config.catalog) {
        Ok(catalog) => catalog.with_default_cache_capacity(config.cache_capacity),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Catalog file: {}", config.catalog.display());
    info!("  Sources: {}", catalog_config.sources.len());
    info!("  Default cache capacity: {}", config.cache_capacity);

    // Initial scans touch the filesystem
    let catalog = match tokio::task::spawn_blocking(move || {
        Catalog::from_config(&catalog_config, BackendRegistry::with_defaults())
    })
    .await
    {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            error!("Failed to build catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let providers = catalog.providers();
    if providers.is_empty() {
        warn!("No provider could be created; the catalog is empty");
    }
    for provider in &providers {
        info!(
            "  {} ({}): {} layer(s) under {}",
            provider.id(),
            provider.kind(),
            provider.keys().len(),
            provider.root().display()
        );
    }

    let router = create_router(Arc::clone(&catalog), build_router_config(&config));
    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/layers", addr);
    info!("    curl http://{}/providers", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Shutting down, releasing open datasets");
    let disposer = Arc::clone(&catalog);
    if let Err(e) = tokio::task::spawn_blocking(move || disposer.dispose_all()).await {
        warn!("Catalog disposal did not complete: {}", e);
    }

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "sdi_catalog=debug,tower_http=debug"
    } else {
        "sdi_catalog=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("SDI Catalog Check");
    println!("═════════════════");
    println!();

    let catalog_config = match CatalogConfig::load(&config.catalog) {
        Ok(c) => {
            println!("✓ Catalog file: {}", config.catalog.display());
            c
        }
        Err(e) => {
            println!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let catalog = Catalog::from_config(&catalog_config, BackendRegistry::with_defaults());
    let providers = catalog.providers();

    println!();
    println!("Providers:");
    println!("──────────");

    let mut ok = true;
    for source in &catalog_config.sources {
        match providers.iter().find(|p| p.id() == source.provider.id) {
            Some(provider) => println!(
                "  ✓ {} ({}): {} layer(s)",
                provider.id(),
                provider.kind(),
                provider.keys().len()
            ),
            None => {
                ok = false;
                println!(
                    "  ✗ {} ({}): not created, rerun with --verbose for details",
                    source.provider.id, source.kind
                );
            }
        }
    }

    if config.list_layers {
        println!();
        println!("Layers:");
        println!("───────");

        let names = catalog.keys();
        if names.is_empty() {
            println!("  (no layers found)");
        }
        for name in &names {
            match catalog.get(name) {
                Some(layer) => println!("  ✓ {} [{}]", name, layer.kind()),
                None => {
                    ok = false;
                    println!("  ✗ {} (failed to open)", name);
                }
            }
        }
        println!();
        println!("Total: {} layer(s)", names.len());
    }

    catalog.dispose_all();

    println!();
    println!("═════════════════");
    if ok {
        println!("✓ All checks passed!");
        ExitCode::SUCCESS
    } else {
        println!("✗ Some checks failed");
        ExitCode::FAILURE
    }
}
