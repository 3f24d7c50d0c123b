use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::spawn::spawn_deferred;
use crate::token::{GenerationClock, GenerationToken};
use crate::{Check, CheckAction, Completion, Emitter, RunParams, Runnable, TestEvent, Verdict};

#[derive(Debug, Default)]
struct TestState {
	pending: bool,
	waiter: Option<Completion>,
	last: Option<Verdict>,
	runs: u64,
}

/// Leaf runnable wrapping a single [`Check`].
///
/// States cycle `ready -> pending -> ready`. A completion is honoured only
/// while the generation captured at start is still current, so a check that
/// reports after [`Runnable::stop`] or a newer start is discarded.
pub struct Test {
	name: Box<str>,
	check: Box<dyn Check>,
	clock: GenerationClock,
	state: RefCell<TestState>,
	events: Emitter<TestEvent>,
	this: Weak<Test>,
}

impl Test {
	/// Creates a test named `name` around `check`.
	pub fn new(name: impl Into<Box<str>>, check: impl Check + 'static) -> Rc<Self> {
		let name = name.into();
		Rc::new_cyclic(|this| Self {
			name,
			check: Box::new(check),
			clock: GenerationClock::new(),
			state: RefCell::default(),
			events: Emitter::new(),
			this: this.clone(),
		})
	}

	/// Returns the test name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the verdict of the last finished run.
	pub fn last(&self) -> Option<Verdict> {
		self.state.borrow().last.clone()
	}

	/// Returns how many runs were started, superseded ones included.
	pub fn run_count(&self) -> u64 {
		self.state.borrow().runs
	}

	fn finish(&self, token: &GenerationToken, verdict: Verdict) {
		if !self.clock.is_current(token) {
			tracing::trace!(test = %self.name, generation = token.generation(), "worker.test.stale");
			return;
		}
		let waiter = {
			let mut state = self.state.borrow_mut();
			if !state.pending {
				return;
			}
			state.pending = false;
			state.last = Some(verdict.clone());
			state.waiter.take()
		};
		tracing::trace!(test = %self.name, generation = token.generation(), fail = verdict.is_fail(), "worker.test.end");
		self.events.emit(&TestEvent::End(verdict.clone()));
		if let Some(waiter) = waiter {
			waiter.complete(verdict);
		}
	}
}

impl Runnable for Test {
	fn start(&self, params: RunParams, completion: Completion) {
		if self.is_pending() {
			self.stop();
		}
		let token = self.clock.begin(completion.cancellation());
		{
			let mut state = self.state.borrow_mut();
			state.pending = true;
			state.waiter = Some(completion);
			state.runs = state.runs.wrapping_add(1);
		}
		tracing::trace!(test = %self.name, generation = token.generation(), "worker.test.run");
		self.events.emit(&TestEvent::Run);

		match self.check.check(&params) {
			CheckAction::Done(verdict) => self.finish(&token, verdict),
			CheckAction::Async(fut) => {
				let this = self.this.clone();
				let run_token = token.clone();
				spawn_deferred(token, fut, move |verdict| {
					if let Some(test) = this.upgrade() {
						test.finish(&run_token, verdict);
					}
				});
			}
		}
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
		tracing::trace!(test = %self.name, generation, "worker.test.stop");
		self.events.emit(&TestEvent::Stop);
	}

	fn is_pending(&self) -> bool {
		self.state.borrow().pending
	}

	fn events(&self) -> &Emitter<TestEvent> {
		&self.events
	}
}

impl std::fmt::Debug for Test {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Test")
			.field("name", &self.name)
			.field("pending", &self.is_pending())
			.field("generation", &self.clock.generation())
			.finish()
	}
}

#[cfg(test)]
mod tests;
