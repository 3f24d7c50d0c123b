//! Shared fixtures for worker unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::{Check, CheckAction, Emitter, RunParams, TestEvent, Verdict};

/// Records every event emitted by `events`.
pub(crate) fn record(events: &Emitter<TestEvent>) -> Rc<RefCell<Vec<TestEvent>>> {
	let log = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&log);
	events.subscribe(move |event| sink.borrow_mut().push(event.clone()));
	log
}

/// A synchronous check returning `verdict` and counting its invocations.
pub(crate) fn counting(verdict: Verdict) -> (impl Check, Rc<Cell<usize>>) {
	let calls = Rc::new(Cell::new(0));
	let counter = Rc::clone(&calls);
	let check = move |_: &RunParams| {
		counter.set(counter.get() + 1);
		CheckAction::Done(verdict.clone())
	};
	(check, calls)
}

/// A deferred check resolving to `verdict` after `ms` milliseconds.
pub(crate) fn after(ms: u64, verdict: Verdict) -> impl Check {
	move |_: &RunParams| {
		let verdict = verdict.clone();
		CheckAction::deferred(async move {
			tokio::time::sleep(Duration::from_millis(ms)).await;
			verdict
		})
	}
}

/// Lets every timer and local task due within `ms` milliseconds run.
pub(crate) async fn advance(ms: u64) {
	tokio::time::sleep(Duration::from_millis(ms)).await;
}
