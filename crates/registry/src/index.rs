use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::KeyKind;
use crate::{CommonStore, DependencyResolver, RegistryError, RuleDef, RulePack};

/// Read-only table of rule definitions and shared config.
///
/// Registries are layered by value: [`Self::install`] returns a new registry
/// holding the receiver's entries plus the pack's, and rejects any key the
/// receiver already claims. The receiver itself never changes, so two layers
/// built from the same base never observe each other's rules.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
	rules: IndexMap<Box<str>, Arc<RuleDef>>,
	common: CommonStore,
	packs: Vec<Box<str>>,
}

impl RuleRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a registry holding the built-in rule pack.
	#[cfg(feature = "builtins")]
	pub fn with_builtins() -> Self {
		Self::new()
			.install(crate::builtins::pack())
			.expect("builtin rule pack declares unique keys")
	}

	/// Returns a new registry extended with `pack`.
	///
	/// # Errors
	///
	/// [`RegistryError::AlreadySet`] if a rule id or common key of `pack` is
	/// already present, either in `self` or earlier in the same pack.
	pub fn install(&self, pack: RulePack) -> Result<Self, RegistryError> {
		let (name, rules, common) = pack.into_parts();
		let mut next = self.clone();
		let collision = |kind: KeyKind, key: &str| RegistryError::AlreadySet {
			kind,
			key: key.to_string(),
			pack: name.to_string(),
		};

		let rule_count = rules.len();
		for def in rules {
			if next.rules.contains_key(def.id()) {
				return Err(collision(KeyKind::Rule, def.id()));
			}
			next.rules.insert(def.id().into(), Arc::new(def));
		}
		let common_count = common.len();
		for (key, value) in common {
			if next.common.contains(&key) {
				return Err(collision(KeyKind::Common, &key));
			}
			next.common.insert(key, value);
		}

		tracing::debug!(pack = %name, rules = rule_count, common = common_count, "registry.install");
		next.packs.push(name);
		Ok(next)
	}

	/// Looks up a rule definition.
	pub fn get(&self, id: &str) -> Option<&Arc<RuleDef>> {
		self.rules.get(id)
	}

	/// Returns true if `id` is registered.
	pub fn contains(&self, id: &str) -> bool {
		self.rules.contains_key(id)
	}

	/// Iterates every definition in installation order.
	pub fn rules(&self) -> impl Iterator<Item = &Arc<RuleDef>> + '_ {
		self.rules.values()
	}

	/// Iterates the auto rules in installation order.
	pub fn autos(&self) -> impl Iterator<Item = &Arc<RuleDef>> + '_ {
		self.rules.values().filter(|def| def.is_auto())
	}

	/// Returns the shared config store.
	pub fn common(&self) -> &CommonStore {
		&self.common
	}

	/// Returns the names of installed packs, oldest first.
	pub fn packs(&self) -> impl Iterator<Item = &str> + '_ {
		self.packs.iter().map(|p| &**p)
	}

	/// Returns the number of rule definitions.
	pub fn len(&self) -> usize {
		self.rules.len()
	}

	/// Returns true if no rule is registered.
	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	/// Returns a dependency resolver over this registry.
	pub fn resolver(&self) -> DependencyResolver<'_> {
		DependencyResolver::new(self)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;
	use vigil_worker::CheckAction;

	use super::*;

	fn pass(id: &str) -> RuleDef {
		RuleDef::from_fn(id, |_, _| CheckAction::pass())
	}

	#[test]
	fn installing_same_rule_twice_fails() {
		let pack = RulePack::new("strings").rule(pass("trim"));
		let registry = RuleRegistry::new().install(pack.clone()).unwrap();

		let err = registry.install(pack).unwrap_err();
		assert_eq!(
			err,
			RegistryError::AlreadySet {
				kind: KeyKind::Rule,
				key: "trim".into(),
				pack: "strings".into(),
			}
		);
		assert!(err.to_string().contains("already set"));
	}

	#[test]
	fn duplicate_inside_one_pack_fails() {
		let pack = RulePack::new("dup").rule(pass("a")).rule(pass("a"));
		assert!(matches!(
			RuleRegistry::new().install(pack),
			Err(RegistryError::AlreadySet { kind: KeyKind::Rule, .. })
		));
	}

	#[test]
	fn common_key_collision_fails() {
		let registry = RuleRegistry::new()
			.install(RulePack::new("one").common("zip", json!("^\\d{5}$")))
			.unwrap();
		let err = registry
			.install(RulePack::new("two").common("zip", json!("^\\d{4}$")))
			.unwrap_err();
		assert!(matches!(err, RegistryError::AlreadySet { kind: KeyKind::Common, .. }));
		assert_eq!(registry.common().pattern("zip"), Some("^\\d{5}$"));
	}

	#[test]
	fn install_leaves_receiver_untouched() {
		let base = RuleRegistry::new().install(RulePack::new("base").rule(pass("a"))).unwrap();
		let left = base.install(RulePack::new("left").rule(pass("b"))).unwrap();
		let right = base.install(RulePack::new("right").rule(pass("b"))).unwrap();

		assert!(!base.contains("b"));
		assert!(left.contains("a") && left.contains("b"));
		assert!(right.contains("b"));
		assert_eq!(left.packs().collect::<Vec<_>>(), vec!["base", "left"]);
	}

	#[test]
	fn non_overlapping_packs_resolve_together() {
		let registry = RuleRegistry::new()
			.install(RulePack::new("one").rule(pass("a")))
			.unwrap()
			.install(RulePack::new("two").rule(pass("b").deps(["a"])))
			.unwrap();

		let plan = registry.resolver().create_test_queue(["b"]).unwrap();
		assert_eq!(plan.ids(), vec!["a", "b"]);
	}
}
