//! Rule definitions, rule-pack registries and dependency resolution.
//!
//! A [`RuleRegistry`] is built by installing [`RulePack`]s. Each install
//! returns a fresh registry, so independently extended registries never see
//! each other's rules. Resolution turns the rule ids requested for one
//! attribute into an [`ExecutionPlan`] where every dependency precedes its
//! dependents.
//!
//! # Feature flags
//!
//! - `builtins` (default): the built-in pack (`required`, `type`, `min`,
//!   `max`, `length`, `match`, `in`, `duplicate`) and common patterns

#[cfg(feature = "builtins")]
pub mod builtins;
mod common;
mod error;
mod index;
mod pack;
mod resolver;
mod rule;

pub use common::CommonStore;
pub use error::{ConfigError, KeyKind, RegistryError, ResolveError};
pub use index::RuleRegistry;
pub use pack::RulePack;
pub use resolver::{DependencyResolver, ExecutionPlan};
pub use rule::{BoundRule, ConfiguredRule, FnRule, Rule, RuleDef, RuleInput};
