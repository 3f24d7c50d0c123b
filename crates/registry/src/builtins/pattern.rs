use regex::Regex;
use serde_json::Value;
use vigil_worker::CheckAction;

use crate::{CommonStore, Rule, RuleInput};

pub(super) struct Pattern {
	name: Box<str>,
	regex: Regex,
}

/// `match`: a regex source, or the name of a common pattern.
pub(super) struct Match;

impl Rule for Match {
	type Config = Pattern;

	fn configure(&self, raw: &Value, common: &CommonStore) -> Result<Pattern, String> {
		let Some(name) = raw.as_str() else {
			return Err(format!("expected a pattern string, got {raw}"));
		};
		let source = common.pattern(name).unwrap_or(name);
		let regex = Regex::new(source).map_err(|e| e.to_string())?;
		Ok(Pattern {
			name: name.into(),
			regex,
		})
	}

	fn evaluate(&self, pattern: &Pattern, input: &RuleInput<'_>) -> CheckAction {
		match input.value.as_str() {
			Some(s) if pattern.regex.is_match(s) => CheckAction::pass(),
			_ => CheckAction::fail(&*pattern.name),
		}
	}
}
