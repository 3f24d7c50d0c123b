//! Dependency expansion of requested rule ids into an ordered queue.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{ResolveError, RuleDef, RuleRegistry};

/// Ordered rule queue produced by [`DependencyResolver::create_test_queue`].
///
/// Every rule appears after all of its transitive dependencies, and at most
/// once.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
	rules: Vec<Arc<RuleDef>>,
}

impl ExecutionPlan {
	/// Returns the rule ids in execution order.
	pub fn ids(&self) -> Vec<&str> {
		self.rules.iter().map(|def| def.id()).collect()
	}

	/// Iterates the definitions in execution order.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<RuleDef>> + '_ {
		self.rules.iter()
	}

	/// Returns true if `id` is part of the plan.
	pub fn contains(&self, id: &str) -> bool {
		self.rules.iter().any(|def| def.id() == id)
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
	Visiting,
	Scheduled,
}

/// Expands rule requests against one registry.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'r> {
	registry: &'r RuleRegistry,
}

impl<'r> DependencyResolver<'r> {
	pub fn new(registry: &'r RuleRegistry) -> Self {
		Self { registry }
	}

	/// Builds the execution queue for `requested`.
	///
	/// Auto rules are expanded first in registry order, then each requested id
	/// in request order. Dependencies are expanded depth-first in declaration
	/// order ahead of their dependent. Duplicates keep their first position.
	///
	/// # Errors
	///
	/// * [`ResolveError::NotRegistered`] for an unknown id, requested or depended upon.
	/// * [`ResolveError::Circular`] when expansion re-enters a rule still on the stack.
	pub fn create_test_queue<I, S>(&self, requested: I) -> Result<ExecutionPlan, ResolveError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut marks = FxHashMap::default();
		let mut rules = Vec::new();

		for def in self.registry.autos() {
			self.visit(def.id(), &mut marks, &mut rules)?;
		}
		for id in requested {
			self.visit(id.as_ref(), &mut marks, &mut rules)?;
		}

		tracing::trace!(len = rules.len(), "resolver.plan");
		Ok(ExecutionPlan { rules })
	}

	fn visit(
		&self,
		id: &str,
		marks: &mut FxHashMap<&'r str, Mark>,
		out: &mut Vec<Arc<RuleDef>>,
	) -> Result<(), ResolveError> {
		let registry: &'r RuleRegistry = self.registry;
		let def = registry
			.get(id)
			.ok_or_else(|| ResolveError::NotRegistered(id.to_string()))?;

		match marks.get(def.id()) {
			Some(Mark::Scheduled) => return Ok(()),
			Some(Mark::Visiting) => return Err(ResolveError::Circular(def.id().to_string())),
			None => {}
		}

		marks.insert(def.id(), Mark::Visiting);
		for dep in def.dependencies() {
			self.visit(dep, marks, out)?;
		}
		marks.insert(def.id(), Mark::Scheduled);
		out.push(Arc::clone(def));
		Ok(())
	}
}
