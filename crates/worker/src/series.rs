use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};

use crate::token::{GenerationClock, GenerationToken};
use crate::{Completion, Emitter, RunParams, Runnable, TestEvent, Verdict};

#[derive(Debug, Default)]
struct SeriesState {
	pending: bool,
	index: usize,
	params: RunParams,
	waiter: Option<Completion>,
}

/// Ordered, short-circuiting collection.
///
/// Children run one at a time in the given order. The series finishes with
/// the first failing child's detail wrapped as `{key: detail}`, finishes
/// clean as soon as a child reports [`Verdict::End`], and otherwise passes
/// once every child passed. Child `n + 1` never starts before child `n`
/// reported.
pub struct Series {
	children: Vec<(Box<str>, Rc<dyn Runnable>)>,
	clock: GenerationClock,
	state: RefCell<SeriesState>,
	events: Emitter<TestEvent>,
	this: Weak<Series>,
}

impl Series {
	/// Creates a series over keyed children.
	pub fn new<I, K>(children: I) -> Rc<Self>
	where
		I: IntoIterator<Item = (K, Rc<dyn Runnable>)>,
		K: Into<Box<str>>,
	{
		let children = children.into_iter().map(|(key, child)| (key.into(), child)).collect();
		Rc::new_cyclic(|this| Self {
			children,
			clock: GenerationClock::new(),
			state: RefCell::default(),
			events: Emitter::new(),
			this: this.clone(),
		})
	}

	/// Returns the child keys in execution order.
	pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
		self.children.iter().map(|(key, _)| &**key)
	}

	/// Returns the number of children.
	pub fn len(&self) -> usize {
		self.children.len()
	}

	/// Returns true when the series has no children.
	pub fn is_empty(&self) -> bool {
		self.children.is_empty()
	}

	/// Returns the key of the child currently running.
	pub fn current(&self) -> Option<&str> {
		let state = self.state.borrow();
		if !state.pending {
			return None;
		}
		self.children.get(state.index).map(|(key, _)| &**key)
	}

	fn launch(&self, token: &GenerationToken, index: usize) {
		let Some((key, child)) = self.children.get(index) else {
			self.finish(token, Verdict::Pass);
			return;
		};
		let params = {
			let mut state = self.state.borrow_mut();
			state.index = index;
			state.params.clone()
		};
		tracing::trace!(child = %key, index, generation = token.generation(), "worker.series.advance");
		let this = self.this.clone();
		let child_token = token.clone();
		child.start(
			params,
			Completion::new(token.cancellation(), move |verdict| {
				if let Some(series) = this.upgrade() {
					series.child_done(&child_token, index, verdict);
				}
			}),
		);
	}

	fn child_done(&self, token: &GenerationToken, index: usize, verdict: Verdict) {
		if !self.clock.is_current(token) {
			tracing::trace!(index, generation = token.generation(), "worker.series.stale");
			return;
		}
		{
			let state = self.state.borrow();
			if !state.pending || state.index != index {
				return;
			}
		}
		match verdict {
			Verdict::Pass => self.launch(token, index + 1),
			Verdict::End => self.finish(token, Verdict::Pass),
			Verdict::Fail(detail) => {
				let mut error = Map::new();
				error.insert(self.children[index].0.to_string(), detail);
				self.finish(token, Verdict::Fail(Value::Object(error)));
			}
		}
	}

	fn finish(&self, token: &GenerationToken, verdict: Verdict) {
		let waiter = {
			let mut state = self.state.borrow_mut();
			if !state.pending {
				return;
			}
			state.pending = false;
			state.waiter.take()
		};
		tracing::trace!(generation = token.generation(), fail = verdict.is_fail(), "worker.series.end");
		self.events.emit(&TestEvent::End(verdict.clone()));
		if let Some(waiter) = waiter {
			waiter.complete(verdict);
		}
	}
}

impl Runnable for Series {
	fn start(&self, params: RunParams, completion: Completion) {
		if self.is_pending() {
			self.stop();
		}
		let token = self.clock.begin(completion.cancellation());
		{
			let mut state = self.state.borrow_mut();
			state.pending = true;
			state.index = 0;
			state.params = params;
			state.waiter = Some(completion);
		}
		tracing::trace!(children = self.children.len(), generation = token.generation(), "worker.series.run");
		self.events.emit(&TestEvent::Run);
		if self.clock.is_current(&token) {
			self.launch(&token, 0);
		}
	}

	fn stop(&self) {
		let (waiter, index) = {
			let mut state = self.state.borrow_mut();
			if !state.pending {
				return;
			}
			state.pending = false;
			(state.waiter.take(), state.index)
		};
		drop(waiter);
		let generation = self.clock.supersede();
		if let Some((_, child)) = self.children.get(index) {
			child.stop();
		}
		tracing::trace!(index, generation, "worker.series.stop");
		self.events.emit(&TestEvent::Stop);
	}

	fn is_pending(&self) -> bool {
		self.state.borrow().pending
	}

	fn events(&self) -> &Emitter<TestEvent> {
		&self.events
	}
}

impl std::fmt::Debug for Series {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Series")
			.field("children", &self.keys().collect::<Vec<_>>())
			.field("pending", &self.is_pending())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;
	use tokio::task::LocalSet;

	use super::*;
	use crate::testing::{advance, after, counting, record};
	use crate::{CheckAction, Test};

	fn series(children: Vec<(&str, Rc<Test>)>) -> Rc<Series> {
		Series::new(children.into_iter().map(|(key, test)| (key, test as Rc<dyn Runnable>)))
	}

	#[test]
	fn stops_at_first_failure() {
		let (a, a_calls) = counting(Verdict::Pass);
		let (b, _) = counting(Verdict::Fail(json!("bad")));
		let (c, c_calls) = counting(Verdict::Pass);
		let series = series(vec![("a", Test::new("a", a)), ("b", Test::new("b", b)), ("c", Test::new("c", c))]);
		let log = record(series.events());

		series.run(RunParams::new(json!("x")));

		assert_eq!(a_calls.get(), 1);
		assert_eq!(c_calls.get(), 0);
		assert_eq!(
			*log.borrow(),
			vec![TestEvent::Run, TestEvent::End(Verdict::Fail(json!({ "b": "bad" })))]
		);
	}

	#[test]
	fn end_signal_short_circuits_clean() {
		let (a, _) = counting(Verdict::Pass);
		let (b, _) = counting(Verdict::End);
		let (c, c_calls) = counting(Verdict::Fail(json!("never")));
		let series = series(vec![("a", Test::new("a", a)), ("b", Test::new("b", b)), ("c", Test::new("c", c))]);
		let log = record(series.events());

		series.run(RunParams::default());

		assert_eq!(c_calls.get(), 0);
		assert_eq!(*log.borrow(), vec![TestEvent::Run, TestEvent::End(Verdict::Pass)]);
	}

	#[test]
	fn empty_series_passes() {
		let series = Series::new(Vec::<(&str, Rc<dyn Runnable>)>::new());
		let log = record(series.events());
		series.run(RunParams::default());
		assert!(!series.is_pending());
		assert_eq!(*log.borrow(), vec![TestEvent::Run, TestEvent::End(Verdict::Pass)]);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn waits_for_deferred_child_before_advancing() {
		LocalSet::new()
			.run_until(async {
				let (b, b_calls) = counting(Verdict::Pass);
				let series = series(vec![("a", Test::new("a", after(10, Verdict::Pass))), ("b", Test::new("b", b))]);

				series.run(RunParams::default());
				assert_eq!(series.current(), Some("a"));
				assert_eq!(b_calls.get(), 0);

				advance(20).await;
				assert_eq!(b_calls.get(), 1);
				assert!(!series.is_pending());
			})
			.await;
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn stop_forwards_to_running_child() {
		LocalSet::new()
			.run_until(async {
				let a = Test::new("a", after(10, Verdict::Pass));
				let (b, b_calls) = counting(Verdict::Pass);
				let series = series(vec![("a", Rc::clone(&a)), ("b", Test::new("b", b))]);
				let log = record(series.events());

				series.run(RunParams::default());
				series.stop();
				assert!(!a.is_pending());

				advance(20).await;
				assert_eq!(b_calls.get(), 0);
				assert_eq!(*log.borrow(), vec![TestEvent::Run, TestEvent::Stop]);
			})
			.await;
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn rerun_reports_only_latest_outcome() {
		LocalSet::new()
			.run_until(async {
				let a = Test::new("a", |params: &RunParams| {
					let value = params.value.clone();
					CheckAction::deferred(async move {
						tokio::time::sleep(std::time::Duration::from_millis(10)).await;
						if value == json!("bad") { Verdict::Fail(json!("rejected")) } else { Verdict::Pass }
					})
				});
				let series = series(vec![("a", a)]);
				let log = record(series.events());

				series.run(RunParams::new(json!("bad")));
				advance(5).await;
				series.run(RunParams::new(json!("good")));
				advance(20).await;

				assert_eq!(
					*log.borrow(),
					vec![TestEvent::Run, TestEvent::Stop, TestEvent::Run, TestEvent::End(Verdict::Pass)]
				);
			})
			.await;
	}
}
