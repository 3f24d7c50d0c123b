use serde_json::Value;
use vigil_worker::CheckAction;

use crate::{CommonStore, Rule, RuleInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
	String,
	Number,
	Integer,
	Boolean,
	Array,
	Object,
}

impl Kind {
	fn parse(name: &str) -> Option<Self> {
		Some(match name {
			"string" => Self::String,
			"number" => Self::Number,
			"integer" => Self::Integer,
			"boolean" => Self::Boolean,
			"array" => Self::Array,
			"object" => Self::Object,
			_ => return None,
		})
	}

	fn name(self) -> &'static str {
		match self {
			Self::String => "string",
			Self::Number => "number",
			Self::Integer => "integer",
			Self::Boolean => "boolean",
			Self::Array => "array",
			Self::Object => "object",
		}
	}

	fn accepts(self, value: &Value) -> bool {
		match self {
			Self::String => value.is_string(),
			Self::Number => value.is_number(),
			Self::Integer => value.is_i64() || value.is_u64(),
			Self::Boolean => value.is_boolean(),
			Self::Array => value.is_array(),
			Self::Object => value.is_object(),
		}
	}
}

/// `type`: JSON kind check. Without config any kind passes.
pub(super) struct Type;

impl Rule for Type {
	type Config = Option<Kind>;

	fn configure(&self, raw: &Value, _common: &CommonStore) -> Result<Option<Kind>, String> {
		match raw {
			Value::Null => Ok(None),
			Value::String(name) => Kind::parse(name)
				.map(Some)
				.ok_or_else(|| format!("unknown type {name:?}")),
			other => Err(format!("expected a type name, got {other}")),
		}
	}

	fn evaluate(&self, kind: &Option<Kind>, input: &RuleInput<'_>) -> CheckAction {
		match kind {
			Some(kind) if !kind.accepts(input.value) => CheckAction::fail(kind.name()),
			_ => CheckAction::pass(),
		}
	}
}
