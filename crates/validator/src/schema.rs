//! Attribute schemas: attribute name to `{rule id: config}`.
//!
//! ```toml
//! [password]
//! required = true
//! length = [8, 64]
//!
//! [password2]
//! duplicate = "password"
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SchemaError;

/// Rule configurations for one attribute, in declaration order.
pub type AttributeRules = IndexMap<String, Value>;

/// Immutable mapping from attribute name to its rule configurations.
///
/// Attribute order is preserved and determines the order of results,
/// relation expansion and fan-out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
	attributes: IndexMap<String, AttributeRules>,
}

impl Schema {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds (or replaces) an attribute with the given rule configurations.
	#[must_use]
	pub fn attribute<I, K>(mut self, name: impl Into<String>, rules: I) -> Self
	where
		I: IntoIterator<Item = (K, Value)>,
		K: Into<String>,
	{
		let rules = rules.into_iter().map(|(rule, config)| (rule.into(), config)).collect();
		self.attributes.insert(name.into(), rules);
		self
	}

	pub fn from_toml_str(source: &str) -> Result<Self, SchemaError> {
		Ok(toml::from_str(source)?)
	}

	pub fn from_json_str(source: &str) -> Result<Self, SchemaError> {
		Ok(serde_json::from_str(source)?)
	}

	/// Loads a schema file, parsed as TOML for `.toml` and JSON otherwise.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|error| SchemaError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		match path.extension().and_then(|ext| ext.to_str()) {
			Some("toml") => Self::from_toml_str(&source),
			_ => Self::from_json_str(&source),
		}
	}

	pub fn get(&self, attribute: &str) -> Option<&AttributeRules> {
		self.attributes.get(attribute)
	}

	/// Iterates attributes in schema order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeRules)> + '_ {
		self.attributes.iter().map(|(name, rules)| (name.as_str(), rules))
	}

	pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
		self.attributes.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.attributes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}
}
