use indexmap::IndexMap;
use serde_json::Value;

/// Shared configuration installed by rule packs (named patterns and the like).
///
/// Read-only once a registry is built; rules consult it while normalising
/// their config.
#[derive(Debug, Clone, Default)]
pub struct CommonStore {
	entries: IndexMap<Box<str>, Value>,
}

impl CommonStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the entry stored under `key`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.get(key)
	}

	/// Returns the entry under `key` when it is a string.
	pub fn pattern(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(Value::as_str)
	}

	/// Returns true if `key` is present.
	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Iterates entries in installation order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
		self.entries.iter().map(|(k, v)| (&**k, v))
	}

	/// Returns the number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if the store is empty.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub(crate) fn insert(&mut self, key: Box<str>, value: Value) {
		self.entries.insert(key, value);
	}
}
