//! Rule definitions and the type-erased binding of a rule to its config.

use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use vigil_worker::{Attributes, Check, CheckAction, RunParams};

use crate::{CommonStore, ConfigError};

/// Input handed to a rule evaluator.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
	/// Attribute under validation.
	pub attribute: &'a str,
	/// Current value of that attribute.
	pub value: &'a Value,
	/// Read-only snapshot of every attribute value.
	pub attributes: &'a Attributes,
}

/// A validation rule.
///
/// `configure` runs once per attribute when a validator is built and turns
/// the raw schema parameters into the rule's own config type; a malformed
/// config is rejected there and never reaches `evaluate`.
pub trait Rule: Send + Sync + 'static {
	/// Normalised per-attribute configuration.
	type Config: 'static;

	/// Validates and coerces raw schema parameters. `raw` is `null` when the
	/// rule was scheduled as a dependency or auto rule without its own entry.
	fn configure(&self, raw: &Value, common: &CommonStore) -> Result<Self::Config, String>;

	/// Evaluates the rule. Report failure through the returned action; a panic
	/// here propagates to the caller.
	fn evaluate(&self, config: &Self::Config, input: &RuleInput<'_>) -> CheckAction;

	/// Other attributes this rule reads, so a change to any of them re-runs
	/// the owning attribute.
	fn relations(&self, _config: &Self::Config) -> Vec<String> {
		Vec::new()
	}
}

/// A rule bound to one normalised config.
pub trait BoundRule {
	/// Evaluates the bound rule.
	fn evaluate(&self, input: &RuleInput<'_>) -> CheckAction;

	/// Attributes the bound rule reads.
	fn relations(&self) -> Vec<String>;
}

struct Bound<R: Rule> {
	rule: Arc<R>,
	config: R::Config,
}

impl<R: Rule> BoundRule for Bound<R> {
	fn evaluate(&self, input: &RuleInput<'_>) -> CheckAction {
		self.rule.evaluate(&self.config, input)
	}

	fn relations(&self) -> Vec<String> {
		self.rule.relations(&self.config)
	}
}

trait ErasedRule: Send + Sync {
	fn bind(self: Arc<Self>, raw: &Value, common: &CommonStore) -> Result<Rc<dyn BoundRule>, String>;
}

impl<R: Rule> ErasedRule for R {
	fn bind(self: Arc<Self>, raw: &Value, common: &CommonStore) -> Result<Rc<dyn BoundRule>, String> {
		let config = self.configure(raw, common)?;
		Ok(Rc::new(Bound { rule: self, config }))
	}
}

/// Rule backed by a closure over the raw config value.
pub struct FnRule<F> {
	f: F,
}

impl<F> Rule for FnRule<F>
where
	F: Fn(&Value, &RuleInput<'_>) -> CheckAction + Send + Sync + 'static,
{
	type Config = Value;

	fn configure(&self, raw: &Value, _common: &CommonStore) -> Result<Value, String> {
		Ok(raw.clone())
	}

	fn evaluate(&self, config: &Value, input: &RuleInput<'_>) -> CheckAction {
		(self.f)(config, input)
	}
}

/// Immutable registry entry for one rule.
#[derive(Clone)]
pub struct RuleDef {
	id: Box<str>,
	deps: Vec<Box<str>>,
	auto: bool,
	description: Box<str>,
	rule: Arc<dyn ErasedRule>,
}

impl RuleDef {
	/// Creates a definition for `rule` under `id`.
	pub fn new<R: Rule>(id: impl Into<Box<str>>, rule: R) -> Self {
		Self {
			id: id.into(),
			deps: Vec::new(),
			auto: false,
			description: Box::default(),
			rule: Arc::new(rule),
		}
	}

	/// Creates a definition from a closure receiving `(config, input)`.
	pub fn from_fn<F>(id: impl Into<Box<str>>, f: F) -> Self
	where
		F: Fn(&Value, &RuleInput<'_>) -> CheckAction + Send + Sync + 'static,
	{
		Self::new(id, FnRule { f })
	}

	/// Sets the rules that must run before this one, in declaration order.
	#[must_use]
	pub fn deps<I, S>(mut self, deps: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<Box<str>>,
	{
		self.deps = deps.into_iter().map(Into::into).collect();
		self
	}

	/// Marks the rule as scheduled for every attribute.
	#[must_use]
	pub fn auto(mut self, auto: bool) -> Self {
		self.auto = auto;
		self
	}

	/// Sets the help text.
	#[must_use]
	pub fn description(mut self, description: impl Into<Box<str>>) -> Self {
		self.description = description.into();
		self
	}

	/// Returns the rule identifier.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Returns the declared dependencies.
	pub fn dependencies(&self) -> impl Iterator<Item = &str> + '_ {
		self.deps.iter().map(|d| &**d)
	}

	/// Returns true for rules included for every attribute.
	pub fn is_auto(&self) -> bool {
		self.auto
	}

	/// Returns the help text.
	pub fn help(&self) -> &str {
		&self.description
	}

	/// Normalises `raw` and binds the rule to the result.
	pub fn bind(&self, raw: &Value, common: &CommonStore) -> Result<Rc<dyn BoundRule>, ConfigError> {
		Arc::clone(&self.rule)
			.bind(raw, common)
			.map_err(|message| ConfigError::new(&*self.id, message))
	}
}

impl std::fmt::Debug for RuleDef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RuleDef")
			.field("id", &self.id)
			.field("deps", &self.deps)
			.field("auto", &self.auto)
			.finish()
	}
}

/// A rule bound to its config and attribute, runnable as a worker [`Check`].
pub struct ConfiguredRule {
	rule: Box<str>,
	attribute: Box<str>,
	bound: Rc<dyn BoundRule>,
}

impl ConfiguredRule {
	/// Binds `def` to `raw` for `attribute`.
	pub fn new(def: &RuleDef, attribute: &str, raw: &Value, common: &CommonStore) -> Result<Self, ConfigError> {
		Ok(Self {
			rule: def.id.clone(),
			attribute: attribute.into(),
			bound: def.bind(raw, common)?,
		})
	}

	/// Returns the rule identifier.
	pub fn rule(&self) -> &str {
		&self.rule
	}

	/// Returns the attribute this rule validates.
	pub fn attribute(&self) -> &str {
		&self.attribute
	}

	/// Attributes the bound rule reads.
	pub fn relations(&self) -> Vec<String> {
		self.bound.relations()
	}
}

impl Check for ConfiguredRule {
	fn check(&self, params: &RunParams) -> CheckAction {
		self.bound.evaluate(&RuleInput {
			attribute: &self.attribute,
			value: &params.value,
			attributes: &params.attributes,
		})
	}
}

impl std::fmt::Debug for ConfiguredRule {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConfiguredRule")
			.field("rule", &self.rule)
			.field("attribute", &self.attribute)
			.finish()
	}
}
