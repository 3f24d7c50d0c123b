use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::task::LocalSet;

use super::*;
use crate::testing::{advance, after, counting, record};

#[test]
fn sync_check_finishes_inside_run() {
	let (check, calls) = counting(Verdict::Pass);
	let test = Test::new("a", check);
	let log = record(test.events());

	test.run(RunParams::new(json!(1)));

	assert!(!test.is_pending());
	assert_eq!(calls.get(), 1);
	assert_eq!(test.last(), Some(Verdict::Pass));
	assert_eq!(*log.borrow(), vec![TestEvent::Run, TestEvent::End(Verdict::Pass)]);
}

#[test]
fn check_sees_run_params() {
	let test = Test::new("min", |params: &RunParams| {
		if params.value.as_i64().unwrap_or_default() >= 5 {
			CheckAction::pass()
		} else {
			CheckAction::fail(json!({ "min": 5 }))
		}
	});

	test.run(RunParams::new(json!(3)));
	assert_eq!(test.last(), Some(Verdict::Fail(json!({ "min": 5 }))));

	test.run(RunParams::new(json!(7)));
	assert_eq!(test.last(), Some(Verdict::Pass));
}

#[test]
fn stop_while_idle_is_silent() {
	let (check, _) = counting(Verdict::Pass);
	let test = Test::new("a", check);
	let log = record(test.events());

	test.stop();

	assert!(log.borrow().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn deferred_check_stays_pending_until_resolved() {
	LocalSet::new()
		.run_until(async {
			let test = Test::new("remote", after(5, Verdict::Fail(json!("taken"))));
			let log = record(test.events());

			test.run(RunParams::new(json!("name")));
			assert!(test.is_pending());
			assert_eq!(*log.borrow(), vec![TestEvent::Run]);

			advance(10).await;

			assert!(!test.is_pending());
			assert_eq!(test.last(), Some(Verdict::Fail(json!("taken"))));
			assert_eq!(*log.borrow(), vec![TestEvent::Run, TestEvent::End(Verdict::Fail(json!("taken")))]);
		})
		.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rerun_discards_superseded_result() {
	LocalSet::new()
		.run_until(async {
			let calls = Rc::new(Cell::new(0u32));
			let counter = Rc::clone(&calls);
			let test = Test::new("remote", move |_: &RunParams| {
				counter.set(counter.get() + 1);
				let (delay, verdict) = if counter.get() == 1 {
					(50, Verdict::Fail(json!("stale")))
				} else {
					(10, Verdict::Pass)
				};
				CheckAction::deferred(async move {
					tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
					verdict
				})
			});
			let log = record(test.events());

			test.run(RunParams::new(json!("first")));
			test.run(RunParams::new(json!("second")));
			advance(100).await;

			assert_eq!(calls.get(), 2);
			assert_eq!(test.run_count(), 2);
			assert_eq!(test.last(), Some(Verdict::Pass));
			assert_eq!(
				*log.borrow(),
				vec![TestEvent::Run, TestEvent::Stop, TestEvent::Run, TestEvent::End(Verdict::Pass)]
			);
		})
		.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stopped_run_never_reaches_its_parent() {
	LocalSet::new()
		.run_until(async {
			let test = Test::new("remote", after(5, Verdict::Pass));
			let log = record(test.events());
			let notified = Rc::new(Cell::new(false));
			let flag = Rc::clone(&notified);
			let parent = tokio_util::sync::CancellationToken::new();

			test.start(RunParams::default(), Completion::new(&parent, move |_| flag.set(true)));
			test.stop();
			advance(20).await;

			assert!(!notified.get());
			assert_eq!(test.last(), None);
			assert_eq!(*log.borrow(), vec![TestEvent::Run, TestEvent::Stop]);
		})
		.await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn parent_cancellation_drops_deferred_check() {
	LocalSet::new()
		.run_until(async {
			let test = Test::new("remote", after(5, Verdict::Pass));
			let parent = tokio_util::sync::CancellationToken::new();

			test.start(RunParams::default(), Completion::new(&parent, |_| {}));
			parent.cancel();
			advance(20).await;

			// The future was dropped; the test is left pending until stopped.
			assert!(test.is_pending());
			assert_eq!(test.last(), None);
			test.stop();
			assert!(!test.is_pending());
		})
		.await;
}
