//! Built-in rule pack.
//!
//! `required` runs for every attribute and short-circuits the remaining
//! rules when the value is absent and optional. Every other rule depends on
//! it directly or through `type`.

mod bounds;
mod choice;
mod duplicate;
mod kind;
mod pattern;
mod presence;

use serde_json::Value;

use crate::{RuleDef, RulePack};

/// Name of the built-in pack.
pub const PACK: &str = "builtins";

/// Named regex sources installed into the common store.
pub const COMMON_PATTERNS: &[(&str, &str)] = &[
	("email", r"^[^@\s]+@[^@\s]+\.[^@\s]+$"),
	("url", r"^[a-zA-Z][a-zA-Z0-9+.-]*://[^\s/?#]+[^\s]*$"),
	("digits", r"^[0-9]+$"),
	("alpha", r"^[A-Za-z]+$"),
	("alphanumeric", r"^[A-Za-z0-9]+$"),
];

/// Builds the built-in pack.
pub fn pack() -> RulePack {
	let rules = [
		RuleDef::new("required", presence::Required)
			.auto(true)
			.description("Fails on an absent value when set; otherwise skips the remaining rules"),
		RuleDef::new("type", kind::Type)
			.deps(["required"])
			.description("Checks the JSON kind of the value"),
		RuleDef::new("min", bounds::Min)
			.deps(["type"])
			.description("Lower numeric bound"),
		RuleDef::new("max", bounds::Max)
			.deps(["type"])
			.description("Upper numeric bound"),
		RuleDef::new("length", bounds::Length)
			.deps(["type"])
			.description("Character count of a string or length of an array"),
		RuleDef::new("match", pattern::Match)
			.deps(["type"])
			.description("String must match a regex or named common pattern"),
		RuleDef::new("in", choice::OneOf)
			.deps(["required"])
			.description("Value must be one of the listed values"),
		RuleDef::new("duplicate", duplicate::Duplicate)
			.deps(["required"])
			.description("Value must equal another attribute's value"),
	];

	let pack = rules.into_iter().fold(RulePack::new(PACK), RulePack::rule);
	COMMON_PATTERNS
		.iter()
		.fold(pack, |pack, (key, source)| pack.common(*key, Value::from(*source)))
}

/// True for `null`, `""`, `[]` and `{}`.
pub(crate) fn is_absent(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
		Value::Bool(_) | Value::Number(_) => false,
	}
}

#[cfg(test)]
mod tests;
