use thiserror::Error;

/// Which registry table a colliding key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
	/// A rule identifier.
	Rule,
	/// A common store entry.
	Common,
}

impl std::fmt::Display for KeyKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Rule => write!(f, "rule"),
			Self::Common => write!(f, "common"),
		}
	}
}

/// Fatal rule-pack installation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// The key is already claimed by an installed pack or earlier in the same pack.
	#[error("{kind} {key:?} already set (installing pack {pack:?})")]
	AlreadySet { kind: KeyKind, key: String, pack: String },
}

/// Dependency resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
	/// A requested or depended-upon rule has no registry entry.
	#[error("rule not registered: {0}")]
	NotRegistered(String),
	/// Expansion revisited a rule still on the active stack.
	#[error("circular dependency at rule {0:?}")]
	Circular(String),
}

/// A rule rejected its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid config for rule {rule:?}: {message}")]
pub struct ConfigError {
	pub rule: String,
	pub message: String,
}

impl ConfigError {
	/// Creates a config error for `rule`.
	pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			rule: rule.into(),
			message: message.into(),
		}
	}
}
