//! Layered asset resolution: first layer that has the asset wins.
//!
//! An asset is requested as `{base}/{layer}{path}` for each layer name in
//! the config stack, most specific first.  This lets a specific layer
//! override a single script, template or package without redeclaring the
//! whole configuration.
pub mod staging;
pub mod transport;

use std::path::PathBuf;

use crate::error::{AssetError, TemplateError};

pub use staging::Staging;
pub use transport::{HttpTransport, LocalTransport, MemoryTransport, Transport, transport_for};

/// How fetched bytes are transformed before staging.
#[derive(Debug, Clone, Copy)]
pub enum Transform<'a> {
    /// Stage the bytes unchanged.
    Identity,
    /// Render the bytes as a template.
    Render(&'a crate::template::TemplateRenderer),
}

impl Transform<'_> {
    fn apply(self, bytes: Vec<u8>) -> Result<Vec<u8>, TemplateError> {
        match self {
            Self::Identity => Ok(bytes),
            Self::Render(renderer) => renderer.render_bytes(&bytes),
        }
    }
}

/// Resolves relative asset paths against the layer chain.
#[derive(Debug)]
pub struct AssetResolver {
    base: String,
    layers: Vec<String>,
    transport: Box<dyn Transport>,
    staging: Staging,
}

impl AssetResolver {
    /// Create a resolver over `layers` (most specific first) below `base`.
    #[must_use]
    pub fn new(
        base: impl Into<String>,
        layers: Vec<String>,
        transport: Box<dyn Transport>,
        staging: Staging,
    ) -> Self {
        Self {
            base: base.into(),
            layers,
            transport,
            staging,
        }
    }

    /// Layer names tried, in order.
    #[must_use]
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    /// The staging directory assets are written to.
    #[must_use]
    pub const fn staging(&self) -> &Staging {
        &self.staging
    }

    /// Fetch `path` (e.g. `/files/zing.conf`), transform it and stage it.
    ///
    /// Layers are tried once each.  A not-found answer moves on to the next
    /// layer; any other failure stops immediately.
    ///
    /// # Errors
    ///
    /// - [`AssetError::NotFound`] if no layer has the asset.
    /// - [`AssetError::Transport`] for the first non-404 failure.
    /// - [`AssetError::Transform`] if rendering fails.
    /// - [`AssetError::Staging`] if the staged file cannot be written.
    pub fn fetch(&self, path: &str, transform: Transform<'_>) -> Result<PathBuf, AssetError> {
        let bytes = self.lookup(path)?;
        let content = transform.apply(bytes).map_err(|source| AssetError::Transform {
            path: path.to_string(),
            source,
        })?;
        self.staging.put(path, &content)
    }

    fn lookup(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        for layer in &self.layers {
            let url = format!("{}/{layer}{path}", self.base);
            tracing::debug!("fetching {url}");
            match self.transport.get(&url) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_not_found() => {}
                Err(source) => {
                    return Err(AssetError::Transport {
                        layer: layer.clone(),
                        path: path.to_string(),
                        source,
                    });
                }
            }
        }
        Err(AssetError::NotFound {
            path: path.to_string(),
            layers: self.layers.clone(),
        })
    }
}
