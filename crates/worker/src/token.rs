use std::cell::{Cell, RefCell};

use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for one runnable's lifecycle.
///
/// Every run captures a [`GenerationToken`] at start. A completion is only
/// honoured while its token is still current; [`Self::supersede`] and
/// [`Self::begin`] invalidate every token handed out before them.
#[derive(Debug, Default)]
pub struct GenerationClock {
	current: Cell<u64>,
	cancel: RefCell<Option<CancellationToken>>,
}

impl GenerationClock {
	/// Creates a new generation clock at generation 0.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the current generation ID.
	pub fn generation(&self) -> u64 {
		self.current.get()
	}

	/// Invalidates the current generation and cancels its token.
	///
	/// Returns the new generation ID.
	pub fn supersede(&self) -> u64 {
		let next = self.current.get().wrapping_add(1);
		self.current.set(next);
		if let Some(cancel) = self.cancel.take() {
			cancel.cancel();
		}
		next
	}

	/// Starts a new generation nested under `parent`.
	///
	/// Cancelling `parent` cancels the returned token as well.
	pub fn begin(&self, parent: &CancellationToken) -> GenerationToken {
		let generation = self.supersede();
		let cancel = parent.child_token();
		self.cancel.replace(Some(cancel.clone()));
		GenerationToken::new(generation, cancel)
	}

	/// Returns true while `token` belongs to the live generation.
	pub fn is_current(&self, token: &GenerationToken) -> bool {
		token.generation == self.current.get() && !token.is_cancelled()
	}
}

/// Generation-scoped cancellation token for one run.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	cancel: CancellationToken,
}

impl GenerationToken {
	/// Creates a new generation token.
	pub fn new(generation: u64, cancel: CancellationToken) -> Self {
		Self { generation, cancel }
	}

	/// Returns generation ID.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Returns the underlying cancellation token.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn begin_supersedes_previous_token() {
		let clock = GenerationClock::new();
		let root = CancellationToken::new();
		let first = clock.begin(&root);
		assert!(clock.is_current(&first));

		let second = clock.begin(&root);
		assert!(!clock.is_current(&first));
		assert!(first.is_cancelled());
		assert!(clock.is_current(&second));
		assert!(second.generation() > first.generation());
	}

	#[test]
	fn supersede_without_begin_invalidates() {
		let clock = GenerationClock::new();
		let token = clock.begin(&CancellationToken::new());
		clock.supersede();
		assert!(!clock.is_current(&token));
		assert!(token.is_cancelled());
	}

	#[test]
	fn parent_cancellation_reaches_children() {
		let clock = GenerationClock::new();
		let parent = CancellationToken::new();
		let token = clock.begin(&parent);
		parent.cancel();
		assert!(token.is_cancelled());
		assert!(token.cancellation().is_cancelled());
		assert!(!clock.is_current(&token));
	}
}
