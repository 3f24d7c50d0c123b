use tokio_util::sync::CancellationToken;

use crate::{Emitter, RunParams, TestEvent, Verdict};

/// One-shot notification from a child runnable to the composite that started it.
///
/// A stopped child drops its completion without calling it; the parent's
/// generation check makes any late call harmless as well.
pub struct Completion {
	notify: Option<Box<dyn FnOnce(Verdict)>>,
	cancel: CancellationToken,
}

impl Completion {
	/// Creates a completion linked to the parent's cancellation token.
	pub fn new(cancel: &CancellationToken, notify: impl FnOnce(Verdict) + 'static) -> Self {
		Self {
			notify: Some(Box::new(notify)),
			cancel: cancel.clone(),
		}
	}

	/// Creates a completion nobody waits on, with its own root token.
	pub fn detached() -> Self {
		Self {
			notify: None,
			cancel: CancellationToken::new(),
		}
	}

	/// Returns the parent's cancellation token.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Delivers the verdict to the parent.
	pub fn complete(mut self, verdict: Verdict) {
		if let Some(notify) = self.notify.take() {
			notify(verdict);
		}
	}
}

impl std::fmt::Debug for Completion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Completion").field("detached", &self.notify.is_none()).finish()
	}
}

/// Uniform start/stop/result lifecycle shared by tests and collections.
pub trait Runnable {
	/// Starts a run, superseding any run still pending.
	///
	/// `completion` is notified once with the verdict of this run unless the
	/// run is stopped or superseded first.
	fn start(&self, params: RunParams, completion: Completion);

	/// Stops the pending run. No-op when idle.
	fn stop(&self);

	/// Returns true while a run is in flight.
	fn is_pending(&self) -> bool;

	/// Lifecycle notifications.
	fn events(&self) -> &Emitter<TestEvent>;

	/// Starts a run observed only through [`Self::events`].
	fn run(&self, params: RunParams) {
		self.start(params, Completion::detached());
	}
}
