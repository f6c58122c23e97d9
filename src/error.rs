//! Domain-specific error types for the bootstrap engine.
//!
//! Internal modules return typed errors built with [`thiserror`]; the command
//! handlers at the CLI boundary convert them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! BootError
//! ├── Config(ConfigError)  — layer fetch, parse, import chain
//! ├── Asset(AssetError)    — asset lookup across layers, staging
//! ├── Build(BuildError)    — malformed sections/items during BUILD
//! └── Task(TaskError)      — task failures during EXECUTE
//! ```
//!
//! [`FetchError`] and [`TemplateError`] are leaf errors wrapped by the above.

use thiserror::Error;

/// Top-level error type for the bootstrap engine.
#[derive(Error, Debug)]
pub enum BootError {
    /// The layered configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An asset could not be resolved or staged.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// A config section or item was malformed.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// A task failed while executing.
    #[error("Task execution error: {0}")]
    Task(#[from] TaskError),
}

/// Failure of a single transport request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The remote store answered that the resource does not exist.
    #[error("not found: {url}")]
    NotFound {
        /// Requested location.
        url: String,
    },

    /// Any other failure (non-404 status, connection error, I/O error).
    #[error("{url}: {message}")]
    Transport {
        /// Requested location.
        url: String,
        /// Human-readable failure description.
        message: String,
    },
}

impl FetchError {
    /// Whether the failure means "try the next layer".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors that arise while loading the layered configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A layer document could not be fetched.
    #[error("config layer '{layer}' is unreachable: {source}")]
    Unreachable {
        /// Name of the layer being loaded.
        layer: String,
        /// Underlying transport failure.
        source: FetchError,
    },

    /// A layer document is not valid JSON.
    #[error("config layer '{layer}' is not valid JSON: {source}")]
    Parse {
        /// Name of the layer being loaded.
        layer: String,
        /// Underlying parser error.
        source: serde_json::Error,
    },

    /// A layer document parsed, but its top level is not an object.
    #[error("config layer '{0}' must be a JSON object")]
    NotAnObject(String),

    /// The `import` key holds something other than a layer name.
    #[error("config layer '{layer}' has an invalid import: expected a string, got {found}")]
    InvalidImport {
        /// Name of the layer declaring the import.
        layer: String,
        /// JSON rendering of the offending value.
        found: String,
    },

    /// The import chain revisits a layer.
    #[error("config import cycle detected: {0}")]
    ImportCycle(String),

    /// The root location has no final path segment to use as a layer name.
    #[error("invalid config location '{0}': expected <base>/<name>")]
    InvalidLocation(String),
}

/// Errors that arise while resolving and staging an asset.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The asset is absent under every layer name.
    #[error("file not found: {path} (tried {})", .layers.join(", "))]
    NotFound {
        /// Relative asset path, e.g. `/files/zing.conf`.
        path: String,
        /// Layer names tried, most specific first.
        layers: Vec<String>,
    },

    /// A layer answered with something other than "not found".
    #[error("error fetching file: {layer}{path}: {source}")]
    Transport {
        /// Layer that produced the failure.
        layer: String,
        /// Relative asset path.
        path: String,
        /// Underlying transport failure.
        source: FetchError,
    },

    /// The fetched bytes could not be transformed (e.g. template rendering).
    #[error("could not render {path}: {source}")]
    Transform {
        /// Relative asset path.
        path: String,
        /// Underlying renderer failure.
        source: TemplateError,
    },

    /// The staged copy could not be written.
    #[error("could not stage {path}: {source}")]
    Staging {
        /// Local staging path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while compiling config sections into tasks.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A per-item handler requires a key that the item does not carry.
    #[error("{section}: item is missing required key '{field}'")]
    MissingField {
        /// Section being processed.
        section: String,
        /// Missing key.
        field: String,
    },

    /// A value has the wrong shape for its position.
    #[error("{section}: invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Section being processed.
        section: String,
        /// Offending key.
        field: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// The dispatcher was asked for a section with no registered handler.
    #[error("no handler registered for section '{0}'")]
    UnknownSection(String),
}

/// Errors that arise during task execution.
#[derive(Error, Debug)]
pub enum TaskError {
    /// A task's action failed.
    #[error("Task '{task}' failed: {reason}")]
    ExecutionFailed {
        /// Description of the task that failed.
        task: String,
        /// Human-readable reason for the failure.
        reason: String,
    },
}

/// Errors that arise while rendering a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A `<%=` tag has no closing `%>`.
    #[error("unterminated tag at byte {0}")]
    Unterminated(usize),

    /// A tag references a fact the host does not provide.
    #[error("unknown fact '{0}'")]
    UnknownFact(String),

    /// The fetched asset is not UTF-8 text.
    #[error("template is not valid UTF-8")]
    NotUtf8,
}
