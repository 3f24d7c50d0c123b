//! Top-level coordinator over every attribute of a schema.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};
use vigil_registry::RuleRegistry;
use vigil_worker::{Attributes, Completion, ContinuousParallel, Emitter, ListenerId, RunParams, Runnable, TestEvent};

use crate::{AttributeStatus, RelationGraph, ResultMap, Runner, Schema, ValidatorError};

/// Capacity of the broadcast channel behind [`Validator::subscribe`].
pub const EVENT_CAPACITY: usize = 64;

/// Supplies the full current attribute snapshot.
pub trait ValueSource {
	/// Returns every attribute value as of now.
	fn snapshot(&self) -> Attributes;
}

impl ValueSource for Attributes {
	fn snapshot(&self) -> Attributes {
		self.clone()
	}
}

/// Notification emitted by a [`Validator`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatorEvent {
	/// An attribute entered the pending state.
	Started { attribute: String },
	/// An attribute's run finished.
	Finished { attribute: String, status: AttributeStatus },
	/// An attribute's run was stopped without a result; its previous status
	/// is back in place.
	Stopped { attribute: String },
	/// Every attribute started by the fan-out has finished.
	Settled { errors: usize },
}

#[derive(Debug, Default)]
struct Slot {
	status: AttributeStatus,
	/// Status to restore if the pending run is stopped.
	settled: AttributeStatus,
}

#[derive(Debug, Default)]
struct ValidatorState {
	values: Option<Rc<Attributes>>,
	slots: Vec<Slot>,
	errors: usize,
	pending: usize,
}

/// Validates a fixed schema against successive attribute snapshots.
///
/// Each attribute gets its own [`Runner`]; runners are fanned out through a
/// [`ContinuousParallel`], so a partial re-run leaves the other attributes'
/// in-flight checks alone. The `errors` and `pending` counters are driven by
/// runner events only, which keeps them consistent across restarts and
/// stops.
pub struct Validator {
	names: Vec<String>,
	runners: Vec<Rc<Runner>>,
	fanout: Rc<ContinuousParallel>,
	relations: RelationGraph,
	state: RefCell<ValidatorState>,
	events: Emitter<ValidatorEvent>,
	broadcast: broadcast::Sender<ValidatorEvent>,
	pending: watch::Sender<usize>,
}

impl Validator {
	/// Builds runners for every schema attribute.
	///
	/// # Errors
	///
	/// Unknown rules, dependency cycles and malformed rule configs fail here,
	/// never during a run.
	pub fn new(registry: &RuleRegistry, schema: &Schema) -> Result<Rc<Self>, ValidatorError> {
		let mut runners = Vec::with_capacity(schema.len());
		let mut relations = RelationGraph::new(schema.names());
		for (attribute, rules) in schema.iter() {
			let runner = Runner::configure(registry, attribute, rules)?;
			for source in runner.relations() {
				relations.relate(source, attribute);
			}
			runners.push(runner);
		}

		let fanout = ContinuousParallel::new(
			runners
				.iter()
				.map(|runner| (runner.attribute(), Rc::clone(runner) as Rc<dyn Runnable>)),
		);
		let names: Vec<String> = schema.names().map(str::to_string).collect();
		let slots = names.iter().map(|_| Slot::default()).collect();
		let (broadcast, _) = broadcast::channel(EVENT_CAPACITY);
		let (pending, _) = watch::channel(0);

		let validator = Rc::new_cyclic(|this: &Weak<Self>| {
			for (index, runner) in runners.iter().enumerate() {
				let this = this.clone();
				runner.events().subscribe(move |event| {
					if let Some(validator) = this.upgrade() {
						validator.runner_event(index, event);
					}
				});
			}
			let this = this.clone();
			fanout.events().subscribe(move |event| {
				if let (TestEvent::End(_), Some(validator)) = (event, this.upgrade()) {
					let errors = validator.errors();
					tracing::debug!(errors, "validator.settled");
					validator.emit(ValidatorEvent::Settled { errors });
				}
			});

			Self {
				names,
				runners,
				fanout,
				relations,
				state: RefCell::new(ValidatorState {
					slots,
					..ValidatorState::default()
				}),
				events: Emitter::new(),
				broadcast,
				pending,
			}
		});
		tracing::debug!(
			attributes = validator.names.len(),
			relations = validator.relations.len(),
			"validator.new"
		);
		Ok(validator)
	}

	/// Builds a validator and seeds its results with [`Self::force`].
	pub fn from_source(
		registry: &RuleRegistry,
		schema: &Schema,
		source: &impl ValueSource,
	) -> Result<Rc<Self>, ValidatorError> {
		let validator = Self::new(registry, schema)?;
		validator.force(source.snapshot());
		Ok(validator)
	}

	/// Re-runs the attributes whose value differs from the last known
	/// snapshot, plus every attribute related to them. Returns the scheduled
	/// attributes in schema order.
	pub fn run(&self, snapshot: Attributes) -> Vec<String> {
		let changed = {
			let state = self.state.borrow();
			changed_keys(state.values.as_deref(), &snapshot)
		};
		let selected = self.relations.expand(changed.iter().map(String::as_str));
		tracing::debug!(changed = changed.len(), selected = selected.len(), "validator.diff");
		self.launch(Rc::new(snapshot), selected)
	}

	/// Runs every attribute regardless of prior values.
	pub fn force(&self, snapshot: Attributes) -> Vec<String> {
		self.launch(Rc::new(snapshot), self.names.clone())
	}

	/// Re-runs against the source's current snapshot.
	pub fn refresh(&self, source: &impl ValueSource) -> Vec<String> {
		self.run(source.snapshot())
	}

	/// Stops every pending attribute, restoring its previous status.
	pub fn stop(&self) {
		self.fanout.stop();
	}

	fn launch(&self, snapshot: Rc<Attributes>, selected: Vec<String>) -> Vec<String> {
		self.state.borrow_mut().values = Some(Rc::clone(&snapshot));
		if selected.is_empty() {
			return selected;
		}
		let values: Map<String, Value> = selected
			.iter()
			.map(|name| (name.clone(), snapshot.get(name).cloned().unwrap_or(Value::Null)))
			.collect();
		tracing::debug!(attributes = ?selected, "validator.run");
		self.fanout
			.start(RunParams::with_attributes(Value::Object(values), snapshot), Completion::detached());
		selected
	}

	fn runner_event(&self, index: usize, event: &TestEvent) {
		let attribute = self.names[index].clone();
		let (emitted, pending) = {
			let mut guard = self.state.borrow_mut();
			let state = &mut *guard;
			let slot = &mut state.slots[index];
			let emitted = match event {
				TestEvent::Run => {
					if slot.status.is_pending() {
						return;
					}
					if slot.status.is_invalid() {
						state.errors = state.errors.saturating_sub(1);
					}
					slot.settled = std::mem::replace(&mut slot.status, AttributeStatus::Pending);
					state.pending += 1;
					ValidatorEvent::Started { attribute }
				}
				TestEvent::End(_) => {
					if !slot.status.is_pending() {
						return;
					}
					let status = match self.runners[index].failure() {
						Some(failure) => AttributeStatus::Invalid(failure),
						None => AttributeStatus::Valid,
					};
					if status.is_invalid() {
						state.errors += 1;
					}
					slot.status = status.clone();
					slot.settled = status.clone();
					state.pending = state.pending.saturating_sub(1);
					ValidatorEvent::Finished { attribute, status }
				}
				TestEvent::Stop => {
					if !slot.status.is_pending() {
						return;
					}
					slot.status = slot.settled.clone();
					if slot.status.is_invalid() {
						state.errors += 1;
					}
					state.pending = state.pending.saturating_sub(1);
					ValidatorEvent::Stopped { attribute }
				}
			};
			(emitted, state.pending)
		};
		self.pending.send_replace(pending);
		self.emit(emitted);
	}

	fn emit(&self, event: ValidatorEvent) {
		tracing::trace!(?event, "validator.event");
		self.events.emit(&event);
		// No receiver is not an error.
		let _ = self.broadcast.send(event);
	}

	/// Returns every attribute's status in schema order.
	pub fn results(&self) -> ResultMap {
		let state = self.state.borrow();
		ResultMap::new(
			self.names
				.iter()
				.cloned()
				.zip(state.slots.iter().map(|slot| slot.status.clone()))
				.collect(),
		)
	}

	/// Returns one attribute's status, or `None` for an unknown attribute.
	pub fn status(&self, attribute: &str) -> Option<AttributeStatus> {
		let index = self.index_of(attribute)?;
		Some(self.state.borrow().slots[index].status.clone())
	}

	/// Number of attributes currently failing.
	///
	/// A pending attribute is not counted, even if its previous run failed;
	/// a stop puts that failure back.
	pub fn errors(&self) -> usize {
		self.state.borrow().errors
	}

	/// Number of attributes currently mid-validation.
	pub fn pending(&self) -> usize {
		self.state.borrow().pending
	}

	/// True when no attribute is failing or pending.
	pub fn is_valid(&self) -> bool {
		let state = self.state.borrow();
		state.errors == 0 && state.pending == 0
	}

	/// Returns an attribute's execution plan.
	pub fn plan(&self, attribute: &str) -> Option<Vec<&str>> {
		self.runner(attribute).map(|runner| runner.plan().collect())
	}

	/// Returns the runner validating `attribute`.
	pub fn runner(&self, attribute: &str) -> Option<&Rc<Runner>> {
		self.index_of(attribute).map(|index| &self.runners[index])
	}

	/// Returns the graph of attributes re-run when another changes.
	pub fn relations(&self) -> &RelationGraph {
		&self.relations
	}

	/// Iterates attribute names in schema order.
	pub fn attributes(&self) -> impl Iterator<Item = &str> + '_ {
		self.names.iter().map(String::as_str)
	}

	/// Returns the last snapshot handed to [`Self::run`] or [`Self::force`].
	pub fn values(&self) -> Option<Rc<Attributes>> {
		self.state.borrow().values.clone()
	}

	/// Registers a synchronous listener.
	pub fn on_event(&self, listener: impl Fn(&ValidatorEvent) + 'static) -> ListenerId {
		self.events.subscribe(listener)
	}

	/// Removes a listener added by [`Self::on_event`].
	pub fn off_event(&self, id: ListenerId) -> bool {
		self.events.unsubscribe(id)
	}

	/// Subscribes to events over a broadcast channel. Slow receivers lag and
	/// drop the oldest events.
	pub fn subscribe(&self) -> broadcast::Receiver<ValidatorEvent> {
		self.broadcast.subscribe()
	}

	/// Resolves once no attribute is pending.
	pub async fn settled(&self) {
		let mut pending = self.pending.subscribe();
		// The sender lives in `self`, so the channel cannot close here.
		let _ = pending.wait_for(|count| *count == 0).await;
	}

	fn index_of(&self, attribute: &str) -> Option<usize> {
		self.names.iter().position(|name| name == attribute)
	}
}

impl std::fmt::Debug for Validator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Validator")
			.field("attributes", &self.names)
			.field("errors", &self.errors())
			.field("pending", &self.pending())
			.finish()
	}
}

/// Keys present in either snapshot whose values differ; a missing key reads
/// as `null`.
fn changed_keys(previous: Option<&Attributes>, next: &Attributes) -> Vec<String> {
	let empty = Attributes::new();
	let previous = previous.unwrap_or(&empty);
	next.keys()
		.chain(previous.keys().filter(|key| !next.contains_key(*key)))
		.filter(|key| previous.get(*key).unwrap_or(&Value::Null) != next.get(*key).unwrap_or(&Value::Null))
		.cloned()
		.collect()
}
