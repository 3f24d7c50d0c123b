//! Per-attribute outcomes and the result map handed to consumers.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// The rule an attribute failed at, and that rule's detail.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFailure {
	pub rule: String,
	pub detail: Value,
}

/// Outcome of one attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeStatus {
	/// Never validated.
	#[default]
	Unchecked,
	/// A run is in flight.
	Pending,
	/// The last run passed.
	Valid,
	/// The last run failed.
	Invalid(RuleFailure),
}

impl AttributeStatus {
	pub fn is_invalid(&self) -> bool {
		matches!(self, Self::Invalid(_))
	}

	pub fn is_pending(&self) -> bool {
		matches!(self, Self::Pending)
	}

	pub fn failure(&self) -> Option<&RuleFailure> {
		match self {
			Self::Invalid(failure) => Some(failure),
			_ => None,
		}
	}
}

/// Serialises as `null` (unchecked or pending), `false` (valid) or
/// `{rule: detail}` (invalid).
impl Serialize for AttributeStatus {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Self::Unchecked | Self::Pending => serializer.serialize_none(),
			Self::Valid => serializer.serialize_bool(false),
			Self::Invalid(failure) => {
				let mut map = serializer.serialize_map(Some(1))?;
				map.serialize_entry(&failure.rule, &failure.detail)?;
				map.end()
			}
		}
	}
}

/// Snapshot of every attribute's status in schema order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct ResultMap {
	entries: IndexMap<String, AttributeStatus>,
}

impl ResultMap {
	pub(crate) fn new(entries: IndexMap<String, AttributeStatus>) -> Self {
		Self { entries }
	}

	pub fn get(&self, attribute: &str) -> Option<&AttributeStatus> {
		self.entries.get(attribute)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeStatus)> + '_ {
		self.entries.iter().map(|(name, status)| (name.as_str(), status))
	}

	/// Iterates the failing attributes.
	pub fn failures(&self) -> impl Iterator<Item = (&str, &RuleFailure)> + '_ {
		self.iter().filter_map(|(name, status)| status.failure().map(|f| (name, f)))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn serialises_to_loose_shapes() {
		let mut entries = IndexMap::new();
		entries.insert("a".to_string(), AttributeStatus::Unchecked);
		entries.insert("b".to_string(), AttributeStatus::Pending);
		entries.insert("c".to_string(), AttributeStatus::Valid);
		entries.insert(
			"d".to_string(),
			AttributeStatus::Invalid(RuleFailure {
				rule: "min".into(),
				detail: json!(5.0),
			}),
		);
		let map = ResultMap::new(entries);

		assert_eq!(
			serde_json::to_value(&map).unwrap(),
			json!({"a": null, "b": null, "c": false, "d": {"min": 5.0}})
		);
		assert_eq!(map.failures().map(|(name, _)| name).collect::<Vec<_>>(), vec!["d"]);
	}
}
