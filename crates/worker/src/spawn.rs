use tokio::task::JoinHandle;

use crate::token::GenerationToken;
use crate::{BoxFuture, Verdict};

/// Drives a deferred check on the current local set.
///
/// The future races the token's cancellation: once the owning run is stopped
/// or superseded the future is dropped and `on_done` never runs.
///
/// # Panics
///
/// Panics when called outside a [`tokio::task::LocalSet`].
pub fn spawn_deferred<F>(token: GenerationToken, fut: BoxFuture, on_done: F) -> JoinHandle<()>
where
	F: FnOnce(Verdict) + 'static,
{
	tracing::trace!(generation = token.generation(), "worker.spawn_deferred");
	tokio::task::spawn_local(async move {
		tokio::select! {
			biased;
			_ = token.cancelled() => {
				tracing::trace!(generation = token.generation(), "worker.deferred.cancelled");
			}
			verdict = fut => on_done(verdict),
		}
	})
}
