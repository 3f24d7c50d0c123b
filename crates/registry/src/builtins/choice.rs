use serde_json::Value;
use vigil_worker::CheckAction;

use crate::{CommonStore, Rule, RuleInput};

/// `in`: membership in a fixed list.
pub(super) struct OneOf;

impl Rule for OneOf {
	type Config = Vec<Value>;

	fn configure(&self, raw: &Value, _common: &CommonStore) -> Result<Vec<Value>, String> {
		match raw {
			Value::Array(allowed) if !allowed.is_empty() => Ok(allowed.clone()),
			Value::Array(_) => Err("allowed list is empty".to_string()),
			other => Err(format!("expected an array, got {other}")),
		}
	}

	fn evaluate(&self, allowed: &Vec<Value>, input: &RuleInput<'_>) -> CheckAction {
		if allowed.contains(input.value) {
			CheckAction::pass()
		} else {
			CheckAction::fail(allowed.clone())
		}
	}
}
