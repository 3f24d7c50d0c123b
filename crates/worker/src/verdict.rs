//! Result and parameter types shared by every runnable.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use serde_json::{Map, Value};

/// Snapshot of every attribute value, keyed by attribute name.
pub type Attributes = Map<String, Value>;

/// Outcome of one check or composite run.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Verdict {
	/// The check passed.
	#[default]
	Pass,
	/// The check failed with a rule-specific detail.
	Fail(Value),
	/// The check passed and the owning series must not schedule further siblings.
	End,
}

impl Verdict {
	/// Returns true for [`Verdict::Fail`].
	pub fn is_fail(&self) -> bool {
		matches!(self, Self::Fail(_))
	}

	/// Returns the failure detail, if any.
	pub fn error(&self) -> Option<&Value> {
		match self {
			Self::Fail(detail) => Some(detail),
			Self::Pass | Self::End => None,
		}
	}
}

/// A boxed local future that resolves to a [`Verdict`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Verdict> + 'static>>;

/// Action returned by a check.
///
/// Checks return this to indicate whether they completed synchronously
/// or need async work.
pub enum CheckAction {
	/// Check completed synchronously with the given verdict.
	Done(Verdict),
	/// Check needs async work. The future is driven on the local set.
	Async(BoxFuture),
}

impl CheckAction {
	/// Creates a sync action that passes.
	pub fn pass() -> Self {
		Self::Done(Verdict::Pass)
	}

	/// Creates a sync action that fails with `detail`.
	pub fn fail(detail: impl Into<Value>) -> Self {
		Self::Done(Verdict::Fail(detail.into()))
	}

	/// Creates a sync action that ends the owning series.
	pub fn end() -> Self {
		Self::Done(Verdict::End)
	}

	/// Wraps a future as a deferred action.
	pub fn deferred<F>(fut: F) -> Self
	where
		F: Future<Output = Verdict> + 'static,
	{
		Self::Async(Box::pin(fut))
	}
}

impl From<Verdict> for CheckAction {
	fn from(verdict: Verdict) -> Self {
		Self::Done(verdict)
	}
}

impl std::fmt::Debug for CheckAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Done(verdict) => f.debug_tuple("Done").field(verdict).finish(),
			Self::Async(_) => f.write_str("Async(..)"),
		}
	}
}

/// Parameters handed to a runnable on every start.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
	/// Value under test. Collections expect an object keyed by child name.
	pub value: Value,
	/// Read-only snapshot of all attribute values.
	pub attributes: Rc<Attributes>,
}

impl RunParams {
	/// Creates params with an empty attribute snapshot.
	pub fn new(value: Value) -> Self {
		Self {
			value,
			attributes: Rc::default(),
		}
	}

	/// Creates params sharing an existing attribute snapshot.
	pub fn with_attributes(value: Value, attributes: Rc<Attributes>) -> Self {
		Self { value, attributes }
	}

	/// Returns params for one child of a keyed collection.
	pub(crate) fn child(&self, key: &str) -> Self {
		Self {
			value: self.value.get(key).cloned().unwrap_or(Value::Null),
			attributes: Rc::clone(&self.attributes),
		}
	}
}

/// A single asynchronous check wrapped by a [`crate::Test`].
pub trait Check {
	/// Evaluates the check against `params`.
	fn check(&self, params: &RunParams) -> CheckAction;
}

impl<F> Check for F
where
	F: Fn(&RunParams) -> CheckAction,
{
	fn check(&self, params: &RunParams) -> CheckAction {
		self(params)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn child_params_pick_keyed_value() {
		let params = RunParams::new(json!({ "a": 1 }));
		assert_eq!(params.child("a").value, json!(1));
		assert_eq!(params.child("b").value, Value::Null);
	}
}
