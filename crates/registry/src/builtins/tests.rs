use std::rc::Rc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};
use vigil_worker::{Attributes, Check, CheckAction, RunParams, Verdict};

use crate::{ConfigError, ConfiguredRule, RuleRegistry};

fn configure(rule: &str, raw: Value) -> Result<ConfiguredRule, ConfigError> {
	let registry = RuleRegistry::with_builtins();
	let def = registry.get(rule).unwrap();
	ConfiguredRule::new(def, "field", &raw, registry.common())
}

fn eval_with(rule: &str, raw: Value, value: Value, attributes: Attributes) -> Verdict {
	let configured = configure(rule, raw).unwrap();
	match configured.check(&RunParams::with_attributes(value, Rc::new(attributes))) {
		CheckAction::Done(verdict) => verdict,
		CheckAction::Async(_) => panic!("builtin {rule} deferred its result"),
	}
}

fn eval(rule: &str, raw: Value, value: Value) -> Verdict {
	eval_with(rule, raw, value, Attributes::new())
}

#[test]
fn pack_layout() {
	let registry = RuleRegistry::with_builtins();
	let autos: Vec<_> = registry.autos().map(|d| d.id()).collect();
	assert_eq!(autos, vec!["required"]);
	assert_eq!(registry.len(), 8);
	assert_eq!(registry.common().len(), super::COMMON_PATTERNS.len());

	let plan = registry.resolver().create_test_queue(["length", "in"]).unwrap();
	assert_eq!(plan.ids(), vec!["required", "type", "length", "in"]);
}

#[rstest]
#[case::null_optional(json!(null), json!(null), Verdict::End)]
#[case::empty_string_optional(json!(false), json!(""), Verdict::End)]
#[case::empty_array_required(json!(true), json!([]), Verdict::Fail(json!(true)))]
#[case::empty_object_required(json!(true), json!({}), Verdict::Fail(json!(true)))]
#[case::present(json!(true), json!("x"), Verdict::Pass)]
#[case::zero_is_present(json!(true), json!(0), Verdict::Pass)]
#[case::false_is_present(json!(true), json!(false), Verdict::Pass)]
fn required(#[case] raw: Value, #[case] value: Value, #[case] expected: Verdict) {
	assert_eq!(eval("required", raw, value), expected);
}

#[rstest]
#[case::unconfigured(json!(null), json!([1]), Verdict::Pass)]
#[case::string(json!("string"), json!("x"), Verdict::Pass)]
#[case::string_mismatch(json!("string"), json!(1), Verdict::Fail(json!("string")))]
#[case::integer(json!("integer"), json!(3), Verdict::Pass)]
#[case::integer_rejects_float(json!("integer"), json!(3.5), Verdict::Fail(json!("integer")))]
#[case::number_accepts_integer(json!("number"), json!(3), Verdict::Pass)]
#[case::object(json!("object"), json!({"a": 1}), Verdict::Pass)]
fn kind(#[case] raw: Value, #[case] value: Value, #[case] expected: Verdict) {
	assert_eq!(eval("type", raw, value), expected);
}

#[rstest]
#[case::min_ok("min", json!(3), json!(3), Verdict::Pass)]
#[case::min_below("min", json!(3), json!(2.5), Verdict::Fail(json!(3.0)))]
#[case::min_non_number("min", json!(3), json!("10"), Verdict::Fail(json!(3.0)))]
#[case::max_ok("max", json!(10), json!(-4), Verdict::Pass)]
#[case::max_above("max", json!(10), json!(11), Verdict::Fail(json!(10.0)))]
fn numeric_bounds(#[case] rule: &str, #[case] raw: Value, #[case] value: Value, #[case] expected: Verdict) {
	assert_eq!(eval(rule, raw, value), expected);
}

#[rstest]
#[case::exact(json!(3), json!("abc"), Verdict::Pass)]
#[case::exact_counts_chars(json!(2), json!("日本"), Verdict::Pass)]
#[case::exact_mismatch(json!(3), json!("ab"), Verdict::Fail(json!(3)))]
#[case::pair(json!([2, 4]), json!([1, 2, 3]), Verdict::Pass)]
#[case::pair_open_max(json!([2, null]), json!("long enough"), Verdict::Pass)]
#[case::pair_too_long(json!([2, 4]), json!("abcde"), Verdict::Fail(json!([2, 4])))]
#[case::object_min(json!({"min": 8}), json!("short"), Verdict::Fail(json!([8, null])))]
#[case::not_measurable(json!(3), json!(123), Verdict::Fail(json!(3)))]
fn length(#[case] raw: Value, #[case] value: Value, #[case] expected: Verdict) {
	assert_eq!(eval("length", raw, value), expected);
}

#[rstest]
#[case::common_email(json!("email"), json!("a@b.io"), Verdict::Pass)]
#[case::common_email_bad(json!("email"), json!("not-an-email"), Verdict::Fail(json!("email")))]
#[case::common_digits(json!("digits"), json!("0042"), Verdict::Pass)]
#[case::common_url(json!("url"), json!("https://example.com/a?b"), Verdict::Pass)]
#[case::inline_source(json!("^x+$"), json!("xxx"), Verdict::Pass)]
#[case::non_string(json!("alpha"), json!(5), Verdict::Fail(json!("alpha")))]
fn pattern(#[case] raw: Value, #[case] value: Value, #[case] expected: Verdict) {
	assert_eq!(eval("match", raw, value), expected);
}

#[test]
fn one_of() {
	assert_eq!(eval("in", json!(["a", 1]), json!(1)), Verdict::Pass);
	assert_eq!(eval("in", json!(["a", 1]), json!("b")), Verdict::Fail(json!(["a", 1])));
}

#[test]
fn duplicate_reads_other_attribute() {
	let mut attributes = Attributes::new();
	attributes.insert("password".into(), json!("hunter2"));

	assert_eq!(
		eval_with("duplicate", json!("password"), json!("hunter2"), attributes.clone()),
		Verdict::Pass
	);
	assert_eq!(
		eval_with("duplicate", json!("password"), json!("hunter3"), attributes),
		Verdict::Fail(json!("password"))
	);
	assert_eq!(configure("duplicate", json!("password")).unwrap().relations(), vec!["password"]);
}

#[rstest]
#[case::required_not_bool("required", json!("yes"))]
#[case::unknown_type("type", json!("float"))]
#[case::min_not_number("min", json!("3"))]
#[case::length_bad_shape("length", json!([1]))]
#[case::length_empty_range("length", json!([5, 2]))]
#[case::length_negative("length", json!(-1))]
#[case::bad_regex("match", json!("("))]
#[case::in_not_array("in", json!("a"))]
#[case::in_empty("in", json!([]))]
#[case::duplicate_not_name("duplicate", json!(3))]
fn malformed_config_is_rejected(#[case] rule: &str, #[case] raw: Value) {
	let err = configure(rule, raw).unwrap_err();
	assert_eq!(err.rule, rule);
}
