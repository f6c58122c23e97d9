//! Layered configuration: a chain of JSON documents linked by `import`.
//!
//! The entry document is the most specific layer.  Each `import` names the
//! next, less specific layer, fetched from the same base location.  The
//! merged view is a shallow override: a top-level key from a more specific
//! layer fully replaces the same key from a less specific one.
pub mod section;

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::assets::Transport;
use crate::error::ConfigError;

pub use section::{Item, Section};

/// Key naming the next layer in the chain.
pub const IMPORT_KEY: &str = "import";

/// Keys with engine meaning that are not sections.
pub const RESERVED_KEYS: &[&str] = &[IMPORT_KEY, "before", "after", "init"];

/// One fetched configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    name: String,
    values: Map<String, Value>,
}

impl ConfigLayer {
    /// Parse a layer document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid JSON,
    /// [`ConfigError::NotAnObject`] if the top level is not an object and
    /// [`ConfigError::InvalidImport`] if `import` is not a string.
    pub fn parse(name: &str, bytes: &[u8]) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|source| ConfigError::Parse {
            layer: name.to_string(),
            source,
        })?;
        let Value::Object(values) = value else {
            return Err(ConfigError::NotAnObject(name.to_string()));
        };
        match values.get(IMPORT_KEY) {
            None | Some(Value::Null | Value::String(_)) => {}
            Some(other) => {
                return Err(ConfigError::InvalidImport {
                    layer: name.to_string(),
                    found: other.to_string(),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            values,
        })
    }

    /// Layer name (its identity in the chain and in asset lookups).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw top-level values.
    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Name of the next layer, if this one imports another.
    #[must_use]
    pub fn import(&self) -> Option<&str> {
        self.values.get(IMPORT_KEY).and_then(Value::as_str)
    }
}

/// The loaded chain of layers, most specific first.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStack {
    base: String,
    layers: Vec<ConfigLayer>,
}

impl ConfigStack {
    /// Build a stack from already-loaded layers.
    #[must_use]
    pub fn from_layers(base: impl Into<String>, layers: Vec<ConfigLayer>) -> Self {
        Self {
            base: base.into(),
            layers,
        }
    }

    /// Load the chain starting at `location` (`{base}/{name}`).
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidLocation`] if `location` has no name segment.
    /// - [`ConfigError::Unreachable`] if any layer cannot be fetched.
    /// - [`ConfigError::Parse`] / [`ConfigError::NotAnObject`] /
    ///   [`ConfigError::InvalidImport`] if any layer is malformed.
    /// - [`ConfigError::ImportCycle`] if a layer name repeats.
    pub fn load(transport: &dyn Transport, location: &str) -> Result<Self, ConfigError> {
        let (base, root) = split_location(location)?;

        let mut layers: Vec<ConfigLayer> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut next = Some(root.to_string());

        while let Some(name) = next.take() {
            if !seen.insert(name.clone()) {
                let mut chain: Vec<&str> = layers.iter().map(ConfigLayer::name).collect();
                chain.push(&name);
                return Err(ConfigError::ImportCycle(chain.join(" -> ")));
            }
            let url = format!("{base}/{name}");
            tracing::debug!("loading config layer {url}");
            let bytes = transport
                .get(&url)
                .map_err(|source| ConfigError::Unreachable {
                    layer: name.clone(),
                    source,
                })?;
            let layer = ConfigLayer::parse(&name, &bytes)?;
            next = layer.import().map(str::to_string);
            layers.push(layer);
        }

        Ok(Self::from_layers(base, layers))
    }

    /// Base location the layer names are appended to.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Layers, most specific first.
    #[must_use]
    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    /// Layer names, most specific first (the asset lookup chain).
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    /// Fold the layers, least specific first, into one view.
    ///
    /// `null` values do not shadow a less specific layer's value.
    #[must_use]
    pub fn merged(&self) -> MergedConfig {
        let mut values = Map::new();
        for layer in self.layers.iter().rev() {
            for (key, value) in &layer.values {
                if !value.is_null() {
                    values.insert(key.clone(), value.clone());
                }
            }
        }
        MergedConfig { values }
    }
}

/// Override-resolved view across all layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedConfig {
    values: Map<String, Value>,
}

impl MergedConfig {
    /// Wrap an already-merged mapping.
    #[must_use]
    pub const fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Look up a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The section stored under `key` (possibly absent).
    #[must_use]
    pub fn section<'a>(&'a self, key: &'a str) -> Section<'a> {
        Section::new(key, self.get(key))
    }

    /// All top-level keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The merged mapping.
    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Split `{base}/{name}` into its base and name.
fn split_location(location: &str) -> Result<(&str, &str), ConfigError> {
    let trimmed = location.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((base, name))
            if !name.is_empty() && !base.is_empty() && !base.ends_with([':', '/']) =>
        {
            Ok((base, name))
        }
        _ => Err(ConfigError::InvalidLocation(location.to_string())),
    }
}
