use rustc_hash::{FxHashMap, FxHashSet};

/// Attribute-to-attribute re-validation edges.
///
/// An edge `source -> dependent` means a change to `source` re-runs
/// `dependent`. Built once from the relations declared by configured rules
/// and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
	order: Vec<String>,
	dependents: FxHashMap<String, Vec<String>>,
}

impl RelationGraph {
	/// Creates an empty graph over attributes in `order`.
	pub fn new<I, S>(order: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			order: order.into_iter().map(Into::into).collect(),
			dependents: FxHashMap::default(),
		}
	}

	/// Records that `dependent` must re-run whenever `source` changes.
	pub fn relate(&mut self, source: &str, dependent: &str) {
		let entry = self.dependents.entry(source.to_string()).or_default();
		if !entry.iter().any(|d| d == dependent) {
			entry.push(dependent.to_string());
		}
	}

	/// Returns the direct dependents of `source`.
	pub fn dependents(&self, source: &str) -> &[String] {
		self.dependents.get(source).map(Vec::as_slice).unwrap_or_default()
	}

	/// Returns the number of edges.
	pub fn len(&self) -> usize {
		self.dependents.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.dependents.is_empty()
	}

	/// Returns every known attribute in `changed` plus everything
	/// transitively related to it, in attribute order.
	///
	/// Names outside the attribute order may act as sources but are not
	/// returned.
	pub fn expand<'a, I>(&self, changed: I) -> Vec<String>
	where
		I: IntoIterator<Item = &'a str>,
	{
		let mut reached: FxHashSet<&str> = FxHashSet::default();
		let mut stack: Vec<&str> = changed.into_iter().collect();
		while let Some(name) = stack.pop() {
			if !reached.insert(name) {
				continue;
			}
			stack.extend(self.dependents(name).iter().map(String::as_str));
		}
		self.order.iter().filter(|name| reached.contains(name.as_str())).cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn graph() -> RelationGraph {
		let mut graph = RelationGraph::new(["email", "password", "password2", "password3"]);
		graph.relate("password", "password2");
		graph.relate("password2", "password3");
		graph
	}

	#[test]
	fn expands_transitively_in_attribute_order() {
		assert_eq!(graph().expand(["password"]), vec!["password", "password2", "password3"]);
		assert_eq!(graph().expand(["password2", "email"]), vec!["email", "password2", "password3"]);
	}

	#[test]
	fn unrelated_change_stays_alone() {
		assert_eq!(graph().expand(["email"]), vec!["email"]);
	}

	#[test]
	fn cycles_terminate() {
		let mut graph = RelationGraph::new(["a", "b"]);
		graph.relate("a", "b");
		graph.relate("b", "a");
		assert_eq!(graph.expand(["b"]), vec!["a", "b"]);
	}

	#[test]
	fn outside_source_reaches_known_dependents() {
		let mut graph = RelationGraph::new(["confirm"]);
		graph.relate("secret", "confirm");
		assert_eq!(graph.expand(["secret"]), vec!["confirm"]);
		assert_eq!(graph.len(), 1);
	}
}
