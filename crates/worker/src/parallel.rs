//! Concurrent collections: [`Parallel`] and [`ContinuousParallel`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};

use crate::token::{GenerationClock, GenerationToken};
use crate::{Completion, Emitter, RunParams, Runnable, TestEvent, Verdict};

type Children = Vec<(Box<str>, Rc<dyn Runnable>)>;

fn collect_children<I, K>(children: I) -> Children
where
	I: IntoIterator<Item = (K, Rc<dyn Runnable>)>,
	K: Into<Box<str>>,
{
	children.into_iter().map(|(key, child)| (key.into(), child)).collect()
}

fn aggregate(errors: Map<String, Value>) -> Verdict {
	if errors.is_empty() { Verdict::Pass } else { Verdict::Fail(Value::Object(errors)) }
}

#[derive(Debug, Default)]
struct ParallelState {
	pending: bool,
	remaining: usize,
	running: Vec<bool>,
	errors: Map<String, Value>,
	waiter: Option<Completion>,
}

/// Collection that starts every child at once.
///
/// `params.value` is an object keyed by child name; each child receives its
/// own sub-value (`null` when absent). The collection finishes once every
/// child reported, failing with `{key: detail}` for each failed child.
pub struct Parallel {
	children: Children,
	clock: GenerationClock,
	state: RefCell<ParallelState>,
	events: Emitter<TestEvent>,
	this: Weak<Parallel>,
}

impl Parallel {
	/// Creates a parallel collection over keyed children.
	pub fn new<I, K>(children: I) -> Rc<Self>
	where
		I: IntoIterator<Item = (K, Rc<dyn Runnable>)>,
		K: Into<Box<str>>,
	{
		let children = collect_children(children);
		Rc::new_cyclic(|this| Self {
			children,
			clock: GenerationClock::new(),
			state: RefCell::default(),
			events: Emitter::new(),
			this: this.clone(),
		})
	}

	/// Returns the number of children still running.
	pub fn remaining(&self) -> usize {
		let state = self.state.borrow();
		if state.pending { state.remaining } else { 0 }
	}

	/// Returns the errors collected so far in the live or last run.
	pub fn errors(&self) -> Map<String, Value> {
		self.state.borrow().errors.clone()
	}

	fn child_done(&self, token: &GenerationToken, index: usize, verdict: Verdict) {
		if !self.clock.is_current(token) {
			tracing::trace!(index, generation = token.generation(), "worker.parallel.stale");
			return;
		}
		let finished = {
			let mut state = self.state.borrow_mut();
			if !state.pending || !state.running.get(index).copied().unwrap_or(false) {
				return;
			}
			state.running[index] = false;
			if let Verdict::Fail(detail) = verdict {
				state.errors.insert(self.children[index].0.to_string(), detail);
			}
			state.remaining = state.remaining.saturating_sub(1);
			state.remaining == 0
		};
		if finished {
			self.finish(token);
		}
	}

	fn finish(&self, token: &GenerationToken) {
		let (waiter, verdict) = {
			let mut state = self.state.borrow_mut();
			if !state.pending {
				return;
			}
			state.pending = false;
			(state.waiter.take(), aggregate(state.errors.clone()))
		};
		tracing::trace!(generation = token.generation(), fail = verdict.is_fail(), "worker.parallel.end");
		self.events.emit(&TestEvent::End(verdict.clone()));
		if let Some(waiter) = waiter {
			waiter.complete(verdict);
		}
	}
}

impl Runnable for Parallel {
	fn start(&self, params: RunParams, completion: Completion) {
		if self.is_pending() {
			self.stop();
		}
		let token = self.clock.begin(completion.cancellation());
		{
			let mut state = self.state.borrow_mut();
			state.pending = true;
			state.remaining = self.children.len();
			state.running = vec![true; self.children.len()];
			state.errors.clear();
			state.waiter = Some(completion);
		}
		tracing::trace!(children = self.children.len(), generation = token.generation(), "worker.parallel.run");
		self.events.emit(&TestEvent::Run);

		if self.children.is_empty() {
			self.finish(&token);
			return;
		}
		for (index, (key, child)) in self.children.iter().enumerate() {
			if !self.clock.is_current(&token) {
				break;
			}
			let this = self.this.clone();
			let child_token = token.clone();
			child.start(
				params.child(key),
				Completion::new(token.cancellation(), move |verdict| {
					if let Some(parallel) = this.upgrade() {
						parallel.child_done(&child_token, index, verdict);
					}
				}),
			);
		}
	}

	fn stop(&self) {
		let (waiter, running) = {
			let mut state = self.state.borrow_mut();
			if !state.pending {
				return;
			}
			state.pending = false;
			(state.waiter.take(), std::mem::take(&mut state.running))
		};
		drop(waiter);
		let generation = self.clock.supersede();
		for ((_, child), running) in self.children.iter().zip(running) {
			if running {
				child.stop();
			}
		}
		tracing::trace!(generation, "worker.parallel.stop");
		self.events.emit(&TestEvent::Stop);
	}

	fn is_pending(&self) -> bool {
		self.state.borrow().pending
	}

	fn events(&self) -> &Emitter<TestEvent> {
		&self.events
	}
}

impl std::fmt::Debug for Parallel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Parallel")
			.field("children", &self.children.iter().map(|(k, _)| &**k).collect::<Vec<_>>())
			.field("pending", &self.is_pending())
			.finish()
	}
}

#[derive(Debug, Default)]
struct ContinuousState {
	token: Option<GenerationToken>,
	/// Bumped by every `start`, including ones that reuse the live token.
	starts: u64,
	/// The `starts` value of the pass that last selected each child.
	claims: Vec<u64>,
	in_flight: Vec<bool>,
	outcomes: Vec<Option<Verdict>>,
	waiter: Option<Completion>,
}

impl ContinuousState {
	fn pending(&self) -> bool {
		self.in_flight.iter().any(|running| *running)
	}
}

/// Parallel collection that only (re)starts the children named in the
/// current value map.
///
/// Children whose key is absent from `params.value` are left untouched: a
/// child still running from an earlier pass keeps running, and its last
/// outcome is kept. The collection is pending while any child is, and
/// finishes with the aggregate of every child's latest outcome.
pub struct ContinuousParallel {
	children: Children,
	clock: GenerationClock,
	state: RefCell<ContinuousState>,
	events: Emitter<TestEvent>,
	this: Weak<ContinuousParallel>,
}

impl ContinuousParallel {
	/// Creates a continuous collection over keyed children.
	pub fn new<I, K>(children: I) -> Rc<Self>
	where
		I: IntoIterator<Item = (K, Rc<dyn Runnable>)>,
		K: Into<Box<str>>,
	{
		let children = collect_children(children);
		let len = children.len();
		Rc::new_cyclic(|this| Self {
			children,
			clock: GenerationClock::new(),
			state: RefCell::new(ContinuousState {
				token: None,
				starts: 0,
				claims: vec![0; len],
				in_flight: vec![false; len],
				outcomes: vec![None; len],
				waiter: None,
			}),
			events: Emitter::new(),
			this: this.clone(),
		})
	}

	/// Returns the keys of the children currently running, in child order.
	pub fn in_flight(&self) -> Vec<&str> {
		let state = self.state.borrow();
		self.children
			.iter()
			.zip(state.in_flight.iter())
			.filter(|(_, running)| **running)
			.map(|(entry, _)| &*entry.0)
			.collect()
	}

	/// Returns the latest finished outcome of the child named `key`.
	pub fn outcome(&self, key: &str) -> Option<Verdict> {
		let index = self.index_of(key)?;
		self.state.borrow().outcomes[index].clone()
	}

	fn index_of(&self, key: &str) -> Option<usize> {
		self.children.iter().position(|(k, _)| &**k == key)
	}

	/// True while child `index` still belongs to the pass numbered `starts`.
	fn claimed(&self, index: usize, starts: u64) -> bool {
		self.state.borrow().claims[index] == starts
	}

	fn child_done(&self, token: &GenerationToken, index: usize, verdict: Verdict) {
		if !self.clock.is_current(token) {
			tracing::trace!(index, generation = token.generation(), "worker.continuous.stale");
			return;
		}
		let settled = {
			let mut state = self.state.borrow_mut();
			if !state.in_flight[index] {
				return;
			}
			state.in_flight[index] = false;
			state.outcomes[index] = Some(verdict);
			!state.pending()
		};
		if settled {
			self.finish(token);
		}
	}

	fn finish(&self, token: &GenerationToken) {
		let (waiter, verdict) = {
			let mut state = self.state.borrow_mut();
			state.token = None;
			let mut errors = Map::new();
			for ((key, _), outcome) in self.children.iter().zip(state.outcomes.iter()) {
				if let Some(Verdict::Fail(detail)) = outcome {
					errors.insert(key.to_string(), detail.clone());
				}
			}
			(state.waiter.take(), aggregate(errors))
		};
		tracing::trace!(generation = token.generation(), fail = verdict.is_fail(), "worker.continuous.end");
		self.events.emit(&TestEvent::End(verdict.clone()));
		if let Some(waiter) = waiter {
			waiter.complete(verdict);
		}
	}
}

impl Runnable for ContinuousParallel {
	fn start(&self, params: RunParams, completion: Completion) {
		let selected: Vec<usize> = match &params.value {
			Value::Object(values) => self
				.children
				.iter()
				.enumerate()
				.filter(|(_, (key, _))| values.contains_key(&**key))
				.map(|(index, _)| index)
				.collect(),
			_ => Vec::new(),
		};

		// Children already running keep the live generation; a fresh one only
		// starts from idle. Selected children are claimed up front so that a
		// pass started from a listener mid-loop takes them over.
		let (token, starts, previous) = {
			let mut state = self.state.borrow_mut();
			let token = match state.token.clone() {
				Some(token) if state.pending() && self.clock.is_current(&token) => token,
				_ => {
					let token = self.clock.begin(completion.cancellation());
					state.token = Some(token.clone());
					token
				}
			};
			state.starts = state.starts.wrapping_add(1);
			let starts = state.starts;
			for &index in &selected {
				state.claims[index] = starts;
				state.in_flight[index] = true;
			}
			(token, starts, state.waiter.replace(completion))
		};
		drop(previous);

		tracing::trace!(selected = selected.len(), generation = token.generation(), "worker.continuous.run");
		self.events.emit(&TestEvent::Run);

		for &index in &selected {
			if !self.clock.is_current(&token) {
				return;
			}
			let child = &self.children[index].1;
			if self.claimed(index, starts) && child.is_pending() {
				child.stop();
			}
		}

		for &index in &selected {
			if !self.clock.is_current(&token) {
				return;
			}
			if !self.claimed(index, starts) {
				tracing::trace!(index, starts, "worker.continuous.reclaimed");
				continue;
			}
			let (key, child) = &self.children[index];
			let this = self.this.clone();
			let child_token = token.clone();
			child.start(
				params.child(key),
				Completion::new(token.cancellation(), move |verdict| {
					if let Some(collection) = this.upgrade() {
						collection.child_done(&child_token, index, verdict);
					}
				}),
			);
		}

		if self.clock.is_current(&token) && !self.state.borrow().pending() && self.state.borrow().token.is_some() {
			self.finish(&token);
		}
	}

	fn stop(&self) {
		let (waiter, running) = {
			let mut state = self.state.borrow_mut();
			if !state.pending() {
				return;
			}
			state.token = None;
			let running = std::mem::replace(&mut state.in_flight, vec![false; self.children.len()]);
			(state.waiter.take(), running)
		};
		drop(waiter);
		let generation = self.clock.supersede();
		for ((_, child), running) in self.children.iter().zip(running) {
			if running {
				child.stop();
			}
		}
		tracing::trace!(generation, "worker.continuous.stop");
		self.events.emit(&TestEvent::Stop);
	}

	fn is_pending(&self) -> bool {
		self.state.borrow().pending()
	}

	fn events(&self) -> &Emitter<TestEvent> {
		&self.events
	}
}

impl std::fmt::Debug for ContinuousParallel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ContinuousParallel")
			.field("children", &self.children.iter().map(|(k, _)| &**k).collect::<Vec<_>>())
			.field("in_flight", &self.in_flight())
			.finish()
	}
}
