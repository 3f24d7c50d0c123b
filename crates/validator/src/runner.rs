//! Per-attribute rule runner.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;
use vigil_registry::{ConfiguredRule, RuleRegistry};
use vigil_worker::{
	Attributes, Completion, Emitter, GenerationClock, GenerationToken, RunParams, Runnable, Series, Test,
	TestEvent, Verdict,
};

use crate::{AttributeRules, RuleFailure, ValidatorError};

#[derive(Debug, Default)]
struct RunnerState {
	pending: bool,
	waiter: Option<Completion>,
	value: Value,
	failure: Option<RuleFailure>,
}

/// Runs one attribute's execution plan as a series of rule tests.
///
/// Re-entrant: starting while pending stops the live run first, and
/// anything the superseded run reports afterwards is discarded. The `End`
/// verdict is `Pass` or `Fail({rule: detail})` for the first failing rule.
pub struct Runner {
	attribute: Box<str>,
	plan: Vec<Box<str>>,
	relations: Vec<String>,
	series: Rc<Series>,
	clock: GenerationClock,
	state: RefCell<RunnerState>,
	events: Emitter<TestEvent>,
	this: Weak<Runner>,
}

impl Runner {
	/// Resolves and configures `rules` for `attribute` against `registry`.
	///
	/// Rules scheduled only as a dependency or auto rule are configured with
	/// `null`.
	pub fn configure(
		registry: &RuleRegistry,
		attribute: &str,
		rules: &AttributeRules,
	) -> Result<Rc<Self>, ValidatorError> {
		let plan = registry
			.resolver()
			.create_test_queue(rules.keys())
			.map_err(|source| ValidatorError::Resolve {
				attribute: attribute.to_string(),
				source,
			})?;
		let configured = plan
			.iter()
			.map(|def| {
				let raw = rules.get(def.id()).unwrap_or(&Value::Null);
				ConfiguredRule::new(def, attribute, raw, registry.common())
			})
			.collect::<Result<Vec<_>, _>>()
			.map_err(|source| ValidatorError::Config {
				attribute: attribute.to_string(),
				source,
			})?;
		Ok(Self::new(attribute, configured))
	}

	/// Creates a runner over already configured rules, run in the given order.
	pub fn new(attribute: &str, rules: Vec<ConfiguredRule>) -> Rc<Self> {
		let plan: Vec<Box<str>> = rules.iter().map(|rule| rule.rule().into()).collect();
		let mut relations: Vec<String> = Vec::new();
		for related in rules.iter().flat_map(ConfiguredRule::relations) {
			if !relations.contains(&related) {
				relations.push(related);
			}
		}
		let series = Series::new(rules.into_iter().map(|rule| {
			let key: Box<str> = rule.rule().into();
			let test: Rc<dyn Runnable> = Test::new(format!("{attribute}.{key}"), rule);
			(key, test)
		}));

		Rc::new_cyclic(|this| Self {
			attribute: attribute.into(),
			plan,
			relations,
			series,
			clock: GenerationClock::new(),
			state: RefCell::default(),
			events: Emitter::new(),
			this: this.clone(),
		})
	}

	/// Runs the plan against `value`, superseding any pending run.
	pub fn run(&self, attributes: Rc<Attributes>, value: Value) {
		self.start(RunParams::with_attributes(value, attributes), Completion::detached());
	}

	/// Name of the attribute this runner validates.
	pub fn attribute(&self) -> &str {
		&self.attribute
	}

	/// Returns the rule ids in execution order.
	pub fn plan(&self) -> impl Iterator<Item = &str> + '_ {
		self.plan.iter().map(|id| &**id)
	}

	/// Attributes whose changes must re-run this one.
	pub fn relations(&self) -> &[String] {
		&self.relations
	}

	/// Returns the rule currently being evaluated.
	pub fn current_rule(&self) -> Option<&str> {
		self.series.current()
	}

	/// Returns the value of the live or last run.
	pub fn value(&self) -> Value {
		self.state.borrow().value.clone()
	}

	/// Returns the failure of the last finished run.
	pub fn failure(&self) -> Option<RuleFailure> {
		self.state.borrow().failure.clone()
	}

	fn series_done(&self, token: &GenerationToken, verdict: Verdict) {
		if !self.clock.is_current(token) {
			tracing::trace!(attribute = %self.attribute, generation = token.generation(), "runner.stale");
			return;
		}
		let failure = failure_of(&verdict);
		let waiter = {
			let mut state = self.state.borrow_mut();
			if !state.pending {
				return;
			}
			state.pending = false;
			state.failure = failure;
			state.waiter.take()
		};
		tracing::debug!(
			attribute = %self.attribute,
			generation = token.generation(),
			fail = verdict.is_fail(),
			"runner.end"
		);
		self.events.emit(&TestEvent::End(verdict.clone()));
		if let Some(waiter) = waiter {
			waiter.complete(verdict);
		}
	}
}

fn failure_of(verdict: &Verdict) -> Option<RuleFailure> {
	match verdict.error()? {
		Value::Object(map) if map.len() == 1 => map.iter().next().map(|(rule, detail)| RuleFailure {
			rule: rule.clone(),
			detail: detail.clone(),
		}),
		other => Some(RuleFailure {
			rule: String::new(),
			detail: other.clone(),
		}),
	}
}

impl Runnable for Runner {
	fn start(&self, params: RunParams, completion: Completion) {
		if self.is_pending() {
			self.stop();
		}
		let token = self.clock.begin(completion.cancellation());
		{
			let mut state = self.state.borrow_mut();
			state.pending = true;
			state.waiter = Some(completion);
			state.value = params.value.clone();
		}
		tracing::debug!(attribute = %self.attribute, generation = token.generation(), "runner.run");
		self.events.emit(&TestEvent::Run);
		if !self.clock.is_current(&token) {
			return;
		}

		let this = self.this.clone();
		let series_token = token.clone();
		self.series.start(
			params,
			Completion::new(token.cancellation(), move |verdict| {
				if let Some(runner) = this.upgrade() {
					runner.series_done(&series_token, verdict);
				}
			}),
		);
	}

	fn stop(&self) {
		let waiter = {
			let mut state = self.state.borrow_mut();
			if !state.pending {
				return;
			}
			state.pending = false;
			state.waiter.take()
		};
		drop(waiter);
		let generation = self.clock.supersede();
		self.series.stop();
		tracing::debug!(attribute = %self.attribute, generation, "runner.stop");
		self.events.emit(&TestEvent::Stop);
	}

	fn is_pending(&self) -> bool {
		self.state.borrow().pending
	}

	fn events(&self) -> &Emitter<TestEvent> {
		&self.events
	}
}

impl std::fmt::Debug for Runner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Runner")
			.field("attribute", &self.attribute)
			.field("plan", &self.plan)
			.field("pending", &self.is_pending())
			.finish()
	}
}
