//! Configuration management for the catalog server.
//!
//! Two layers of configuration exist:
//! - Process settings (bind address, logging, CORS) come from the command
//!   line via clap, with `SDI_`-prefixed environment variable fallbacks.
//! - Backing sources come from a JSON catalog file, one entry per provider.
//!
//! # Catalog File
//!
//! ```json
//! {
//!   "sources": [
//!     {
//!       "kind": "vector",
//!       "id": "base",
//!       "root": "/data/shapefiles",
//!       "namespace": "topo",
//!       "exclude": ["scratch"],
//!       "layers": {
//!         "roads": { "styles": ["line", "casing"], "time_field": "built" }
//!       }
//!     },
//!     { "kind": "raster", "id": "dem", "root": "/data/dem", "namespace": "-" }
//!   ]
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `SDI_HOST` - Server bind address (default: 0.0.0.0)
//! - `SDI_PORT` - Server port (default: 8080)
//! - `SDI_CATALOG` - Path to the catalog file (required)
//! - `SDI_CACHE_CAPACITY` - Open handles kept per provider (default: 10)
//! - `SDI_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::CatalogError;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

// =============================================================================
// CLI Arguments
// =============================================================================

/// SDI Catalog - named-resource catalog for spatial data servers.
#[derive(Parser, Debug)]
#[command(name = "sdi-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan all configured sources and serve the catalog over HTTP
    Serve(ServeConfig),

    /// Scan all configured sources once and report what was found
    Check(CheckConfig),
}

/// Options for the `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SDI_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SDI_PORT")]
    pub port: u16,

    /// Path to the JSON catalog file describing the backing sources.
    #[arg(long, env = "SDI_CATALOG")]
    pub catalog: PathBuf,

    /// Number of open dataset handles each provider keeps cached.
    ///
    /// Applies to sources that do not set `cache_capacity` themselves.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY, env = "SDI_CACHE_CAPACITY")]
    pub cache_capacity: usize,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "SDI_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.catalog.as_os_str().is_empty() {
            return Err("Catalog file is required. Set --catalog or SDI_CATALOG".to_string());
        }

        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Options for the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Path to the JSON catalog file describing the backing sources.
    #[arg(long, env = "SDI_CATALOG")]
    pub catalog: PathBuf,

    /// Print every indexed layer name.
    #[arg(long, default_value_t = false)]
    pub list_layers: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Catalog File
// =============================================================================

/// Root of the catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl CatalogConfig {
    /// Read and parse a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::CatalogFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_json(&text).map_err(|reason| CatalogError::CatalogFile {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    /// Fill in `cache_capacity` for sources that leave it unset.
    pub fn with_default_cache_capacity(mut self, capacity: usize) -> Self {
        for source in &mut self.sources {
            source.provider.cache_capacity.get_or_insert(capacity);
        }
        self
    }
}

/// One backing source: the backend kind plus its provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Backend kind, e.g. "vector" or "raster"
    pub kind: String,

    #[serde(flatten)]
    pub provider: ProviderConfig,
}

/// Settings for a single provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used in logs and by management endpoints
    pub id: String,

    /// Directory scanned for datasets
    pub root: PathBuf,

    /// Namespace override; absent means the kind default, `"-"` means none
    #[serde(default)]
    pub namespace: Option<String>,

    /// When non-empty, only these layer names are indexed
    #[serde(default)]
    pub include: Vec<String>,

    /// Layer names that are never indexed
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Index every matching file when no include list is given
    #[serde(default = "default_load_all")]
    pub load_all: bool,

    /// Maximum number of open handles kept by the provider
    #[serde(default)]
    pub cache_capacity: Option<usize>,

    /// Per-layer metadata keyed by local layer name
    #[serde(default)]
    pub layers: HashMap<String, LayerConfig>,
}

fn default_load_all() -> bool {
    true
}

impl ProviderConfig {
    /// Create a configuration that loads everything under `root`.
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            namespace: None,
            include: Vec::new(),
            exclude: Vec::new(),
            load_all: true,
            cache_capacity: None,
            layers: HashMap::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_load_all(mut self, load_all: bool) -> Self {
        self.load_all = load_all;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn with_layer(mut self, local: impl Into<String>, layer: LayerConfig) -> Self {
        self.layers.insert(local.into(), layer);
        self
    }

    /// Effective cache capacity (zero is bumped to one).
    pub fn effective_cache_capacity(&self) -> usize {
        self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY).max(1)
    }
}

/// Display and query metadata configured for one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub styles: Vec<String>,

    #[serde(default)]
    pub time_field: Option<String>,

    #[serde(default)]
    pub elevation_field: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
