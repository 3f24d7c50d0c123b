use serde_json::Value;

use crate::RuleDef;

/// A bundle of rule definitions and shared config installed together.
///
/// Mirrors the plugin shape `{use: {ruleId: def}, common: {key: value}}`.
/// Keys are checked for collisions when the pack is installed, not here.
#[derive(Debug, Clone)]
pub struct RulePack {
	name: Box<str>,
	rules: Vec<RuleDef>,
	common: Vec<(Box<str>, Value)>,
}

impl RulePack {
	/// Creates an empty pack.
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self {
			name: name.into(),
			rules: Vec::new(),
			common: Vec::new(),
		}
	}

	/// Adds a rule definition.
	#[must_use]
	pub fn rule(mut self, def: RuleDef) -> Self {
		self.rules.push(def);
		self
	}

	/// Adds a shared config entry.
	#[must_use]
	pub fn common(mut self, key: impl Into<Box<str>>, value: impl Into<Value>) -> Self {
		self.common.push((key.into(), value.into()));
		self
	}

	/// Returns the pack name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the rule definitions in insertion order.
	pub fn rules(&self) -> &[RuleDef] {
		&self.rules
	}

	pub(crate) fn into_parts(self) -> (Box<str>, Vec<RuleDef>, Vec<(Box<str>, Value)>) {
		(self.name, self.rules, self.common)
	}
}
