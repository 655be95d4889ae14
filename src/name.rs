//! Identity and addressing primitives.
//!
//! A [`Name`] is what protocol workers ask for; a [`Locator`] is where the
//! bytes behind that name live. Providers hold an index of [`IndexEntry`]
//! pairs built by the scanner and never expose locators upward.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Namespace parameter value meaning "no namespace at all".
///
/// Overrides the provider-kind default namespace.
pub const NO_NAMESPACE: &str = "-";

/// Separator between namespace and local identifier in the textual form.
const SEPARATOR: char = ':';

// =============================================================================
// Name
// =============================================================================

/// Namespace-qualified identifier of a catalog entry.
///
/// Two names are equal iff both the namespace and the local part match.
/// The textual form is `namespace:local`, or just `local` when the
/// namespace is null.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    namespace: Option<String>,
    local: String,
}

impl Name {
    /// Create a name from an optional namespace and a local identifier.
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// Create a name with a null namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local_part(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}{}{}", ns, SEPARATOR, self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl FromStr for Name {
    type Err = String;

    /// Parse `namespace:local` or `local`.
    ///
    /// The last separator splits, so namespaces such as `urn:sdi:topo` keep
    /// their own colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, local) = match s.rsplit_once(SEPARATOR) {
            Some((ns, local)) => (Some(ns), local),
            None => (None, s),
        };

        if local.is_empty() {
            return Err(format!("Layer name '{}' has an empty local part", s));
        }
        if namespace == Some("") {
            return Err(format!("Layer name '{}' has an empty namespace", s));
        }

        Ok(Name::new(namespace, local))
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Locator
// =============================================================================

/// Opaque reference to where a resource's raw data lives.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    path: PathBuf,
}

impl Locator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// One row of a provider's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: Name,
    pub locator: Locator,
}

// =============================================================================
// Namespace Policy
// =============================================================================

/// How a provider assigns namespaces to the names it indexes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespacePolicy {
    /// Use the backend kind's default namespace
    #[default]
    KindDefault,
    /// Null namespace, overriding the kind default
    None,
    /// An explicit namespace
    Explicit(String),
}

impl NamespacePolicy {
    /// Interpret the optional namespace parameter of a source configuration.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None => NamespacePolicy::KindDefault,
            Some(NO_NAMESPACE) => NamespacePolicy::None,
            Some(ns) => NamespacePolicy::Explicit(ns.to_string()),
        }
    }

    /// Resolve the namespace to stamp on names, given the kind default.
    pub fn resolve<'a>(&'a self, kind_default: Option<&'a str>) -> Option<&'a str> {
        match self {
            NamespacePolicy::KindDefault => kind_default,
            NamespacePolicy::None => None,
            NamespacePolicy::Explicit(ns) => Some(ns.as_str()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
