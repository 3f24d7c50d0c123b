use serde_json::Value;
use vigil_worker::CheckAction;

use crate::{CommonStore, Rule, RuleInput};

/// `duplicate`: the value must equal another attribute's current value.
pub(super) struct Duplicate;

impl Rule for Duplicate {
	type Config = String;

	fn configure(&self, raw: &Value, _common: &CommonStore) -> Result<String, String> {
		match raw.as_str() {
			Some(other) if !other.is_empty() => Ok(other.to_string()),
			_ => Err(format!("expected an attribute name, got {raw}")),
		}
	}

	fn evaluate(&self, other: &String, input: &RuleInput<'_>) -> CheckAction {
		let expected = input.attributes.get(other).unwrap_or(&Value::Null);
		if expected == input.value {
			CheckAction::pass()
		} else {
			CheckAction::fail(other.as_str())
		}
	}

	fn relations(&self, other: &String) -> Vec<String> {
		vec![other.clone()]
	}
}
