//! Attribute validation on top of the rule registry and worker primitives.
//!
//! A [`Validator`] is built from a [`vigil_registry::RuleRegistry`] and a
//! [`Schema`]. Construction resolves and configures every attribute's rules
//! up front, so a bad schema fails immediately. Afterwards each snapshot
//! passed to [`Validator::run`] re-validates only the attributes whose value
//! changed, plus the attributes related to them.
//!
//! Deferred rules need a [`tokio::task::LocalSet`]; purely synchronous
//! schemas settle inside the call that started them.

mod error;
mod relations;
mod result;
mod runner;
mod schema;
mod validator;

pub use error::{SchemaError, ValidatorError};
pub use relations::RelationGraph;
pub use result::{AttributeStatus, ResultMap, RuleFailure};
pub use runner::Runner;
pub use schema::{AttributeRules, Schema};
pub use validator::{EVENT_CAPACITY, Validator, ValidatorEvent, ValueSource};
