use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::Verdict;

/// Lifecycle notification emitted by every runnable.
#[derive(Debug, Clone, PartialEq)]
pub enum TestEvent {
	/// A run started.
	Run,
	/// The live run finished with a verdict.
	End(Verdict),
	/// The live run was stopped before finishing.
	Stop,
}

/// Handle returned by [`Emitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Rc<dyn Fn(&E)>;

/// Single-threaded observer list.
///
/// Dispatch walks a snapshot of the listeners, so a listener may subscribe,
/// unsubscribe or re-enter the emitting component while it is notified.
pub struct Emitter<E> {
	listeners: RefCell<Vec<(ListenerId, Listener<E>)>>,
	next_id: Cell<u64>,
}

impl<E> Default for Emitter<E> {
	fn default() -> Self {
		Self {
			listeners: RefCell::new(Vec::new()),
			next_id: Cell::new(0),
		}
	}
}

impl<E> Emitter<E> {
	/// Creates an emitter with no listeners.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a listener.
	pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> ListenerId {
		let id = ListenerId(self.next_id.get());
		self.next_id.set(id.0.wrapping_add(1));
		self.listeners.borrow_mut().push((id, Rc::new(listener)));
		id
	}

	/// Removes a listener. Returns false if it was not registered.
	pub fn unsubscribe(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.borrow_mut();
		let before = listeners.len();
		listeners.retain(|(lid, _)| *lid != id);
		listeners.len() != before
	}

	/// Returns the number of registered listeners.
	pub fn len(&self) -> usize {
		self.listeners.borrow().len()
	}

	/// Returns true if no listener is registered.
	pub fn is_empty(&self) -> bool {
		self.listeners.borrow().is_empty()
	}

	/// Notifies every listener registered at the time of the call.
	pub fn emit(&self, event: &E) {
		let snapshot: Vec<Listener<E>> = self.listeners.borrow().iter().map(|(_, l)| Rc::clone(l)).collect();
		for listener in snapshot {
			listener(event);
		}
	}
}

impl<E> std::fmt::Debug for Emitter<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Emitter").field("listeners", &self.len()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn listener_may_unsubscribe_during_dispatch() {
		let emitter = Rc::new(Emitter::<u32>::new());
		let seen = Rc::new(RefCell::new(Vec::new()));

		let id_cell = Rc::new(Cell::new(None));
		let weak = Rc::downgrade(&emitter);
		let seen_once = Rc::clone(&seen);
		let id_for_listener = Rc::clone(&id_cell);
		let id = emitter.subscribe(move |n| {
			seen_once.borrow_mut().push(("once", *n));
			if let (Some(emitter), Some(id)) = (weak.upgrade(), id_for_listener.get()) {
				emitter.unsubscribe(id);
			}
		});
		id_cell.set(Some(id));

		let seen_always = Rc::clone(&seen);
		emitter.subscribe(move |n| seen_always.borrow_mut().push(("always", *n)));

		emitter.emit(&1);
		emitter.emit(&2);

		assert_eq!(*seen.borrow(), vec![("once", 1), ("always", 1), ("always", 2)]);
		assert_eq!(emitter.len(), 1);
	}
}
