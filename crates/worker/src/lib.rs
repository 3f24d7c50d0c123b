//! Generation-scoped test scheduling primitives.
//!
//! Everything here runs on one thread. "Concurrency" means interleaved
//! completions of deferred checks driven by a [`tokio::task::LocalSet`];
//! synchronous checks complete inside the call that started them.
//!
//! - [`Test`]: a single check with a `ready -> pending -> ready` lifecycle
//! - [`Series`]: ordered children, stopping at the first failure or end signal
//! - [`Parallel`]: children started together, finishing when all reported
//! - [`ContinuousParallel`]: partial re-runs keyed by the current value map
//!
//! Cancellation is cooperative. Each run captures a [`GenerationToken`]; a
//! stop or newer run advances the owning [`GenerationClock`] and any late
//! completion from the superseded run is discarded.

mod emitter;
mod parallel;
mod runnable;
mod series;
mod spawn;
#[cfg(test)]
mod testing;
mod token;
mod unit;
mod verdict;

pub use emitter::{Emitter, ListenerId, TestEvent};
pub use parallel::{ContinuousParallel, Parallel};
pub use runnable::{Completion, Runnable};
pub use series::Series;
pub use spawn::spawn_deferred;
pub use token::{GenerationClock, GenerationToken};
pub use unit::Test;
pub use verdict::{Attributes, BoxFuture, Check, CheckAction, RunParams, Verdict};
pub use tokio_util::sync::CancellationToken;
