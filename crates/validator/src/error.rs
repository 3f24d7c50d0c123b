//! Error types for schema loading and validator construction.

use std::path::PathBuf;

use thiserror::Error;
use vigil_registry::{ConfigError, ResolveError};

/// Errors that can occur when loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML schema error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error parsing JSON syntax or shape.
	#[error("JSON schema error: {0}")]
	Json(#[from] serde_json::Error),

	/// Error reading a schema file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Fatal errors raised while building a validator. Nothing here surfaces
/// once validation runs have started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
	/// The attribute's rule list could not be resolved.
	#[error("attribute {attribute:?}: {source}")]
	Resolve {
		attribute: String,
		#[source]
		source: ResolveError,
	},

	/// A rule rejected the attribute's configuration.
	#[error("attribute {attribute:?}: {source}")]
	Config {
		attribute: String,
		#[source]
		source: ConfigError,
	},
}
