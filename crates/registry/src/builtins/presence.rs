use serde_json::Value;
use vigil_worker::CheckAction;

use super::is_absent;
use crate::{CommonStore, Rule, RuleInput};

/// `required`: scheduled for every attribute.
pub(super) struct Required;

impl Rule for Required {
	type Config = bool;

	fn configure(&self, raw: &Value, _common: &CommonStore) -> Result<bool, String> {
		match raw {
			Value::Null => Ok(false),
			Value::Bool(required) => Ok(*required),
			other => Err(format!("expected a boolean, got {other}")),
		}
	}

	fn evaluate(&self, required: &bool, input: &RuleInput<'_>) -> CheckAction {
		match (is_absent(input.value), *required) {
			(false, _) => CheckAction::pass(),
			(true, true) => CheckAction::fail(true),
			(true, false) => CheckAction::end(),
		}
	}
}
