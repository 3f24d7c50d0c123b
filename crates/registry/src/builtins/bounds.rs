//! Numeric and length bounds.

use serde_json::Value;
use vigil_worker::CheckAction;

use crate::{CommonStore, Rule, RuleInput};

fn number(raw: &Value) -> Result<f64, String> {
	raw.as_f64().ok_or_else(|| format!("expected a number, got {raw}"))
}

/// `min`: the value must be a number no smaller than the bound.
pub(super) struct Min;

impl Rule for Min {
	type Config = f64;

	fn configure(&self, raw: &Value, _common: &CommonStore) -> Result<f64, String> {
		number(raw)
	}

	fn evaluate(&self, bound: &f64, input: &RuleInput<'_>) -> CheckAction {
		match input.value.as_f64() {
			Some(n) if n >= *bound => CheckAction::pass(),
			_ => CheckAction::fail(*bound),
		}
	}
}

/// `max`: the value must be a number no greater than the bound.
pub(super) struct Max;

impl Rule for Max {
	type Config = f64;

	fn configure(&self, raw: &Value, _common: &CommonStore) -> Result<f64, String> {
		number(raw)
	}

	fn evaluate(&self, bound: &f64, input: &RuleInput<'_>) -> CheckAction {
		match input.value.as_f64() {
			Some(n) if n <= *bound => CheckAction::pass(),
			_ => CheckAction::fail(*bound),
		}
	}
}

/// Inclusive length range; `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Span {
	min: Option<usize>,
	max: Option<usize>,
}

impl Span {
	fn contains(self, len: usize) -> bool {
		self.min.is_none_or(|min| len >= min) && self.max.is_none_or(|max| len <= max)
	}

	fn detail(self) -> Value {
		match (self.min, self.max) {
			(Some(min), Some(max)) if min == max => Value::from(min),
			(min, max) => Value::Array(vec![
				min.map_or(Value::Null, Value::from),
				max.map_or(Value::Null, Value::from),
			]),
		}
	}
}

fn side(raw: Option<&Value>) -> Result<Option<usize>, String> {
	match raw {
		None | Some(Value::Null) => Ok(None),
		Some(v) => v
			.as_u64()
			.and_then(|n| usize::try_from(n).ok())
			.map(Some)
			.ok_or_else(|| format!("expected a non-negative integer, got {v}")),
	}
}

/// `length`: `n`, `[min, max]` or `{min, max}`.
pub(super) struct Length;

impl Rule for Length {
	type Config = Span;

	fn configure(&self, raw: &Value, _common: &CommonStore) -> Result<Span, String> {
		let span = match raw {
			Value::Number(_) => {
				let n = side(Some(raw))?;
				Span { min: n, max: n }
			}
			Value::Array(pair) if pair.len() == 2 => Span {
				min: side(pair.first())?,
				max: side(pair.get(1))?,
			},
			Value::Object(map) => Span {
				min: side(map.get("min"))?,
				max: side(map.get("max"))?,
			},
			other => return Err(format!("expected n, [min, max] or {{min, max}}, got {other}")),
		};
		if let (Some(min), Some(max)) = (span.min, span.max)
			&& min > max
		{
			return Err(format!("empty range: min {min} exceeds max {max}"));
		}
		Ok(span)
	}

	fn evaluate(&self, span: &Span, input: &RuleInput<'_>) -> CheckAction {
		let len = match input.value {
			Value::String(s) => s.chars().count(),
			Value::Array(items) => items.len(),
			_ => return CheckAction::fail(span.detail()),
		};
		if span.contains(len) {
			CheckAction::pass()
		} else {
			CheckAction::fail(span.detail())
		}
	}
}
