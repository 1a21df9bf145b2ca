use tokio::sync::watch;

/// Cooperative cancellation signal shared between `Session` and its drivers, modeled on the
/// `tokio::sync::watch` handles the teacher uses to signal readiness across tasks
/// (`agent_xds::AdsClient::block_ready`, `StateManager::new`'s `awaiting_ready`).
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
	let (tx, rx) = watch::channel(false);
	(CancelHandle(tx), CancelToken(rx))
}

/// Owned only by `Stop` (spec.md §5): the single writer of the shared cancellation handle.
#[derive(Clone)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
	pub fn cancel(&self) {
		// Ignore send errors: a dropped receiver means the session loop already exited.
		let _ = self.0.send(true);
	}
}

/// Read side, cloned into every driver call and polled at every suspension point.
#[derive(Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
	pub fn is_cancelled(&self) -> bool {
		*self.0.borrow()
	}

	/// Resolves once `Stop` has been called. Backoff waits race this against their timer.
	pub async fn cancelled(&mut self) {
		let _ = self.0.wait_for(|cancelled| *cancelled).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn cancel_is_observed_across_clones() {
		let (handle, mut token) = cancel_pair();
		let mut token2 = token.clone();
		assert!(!token.is_cancelled());
		handle.cancel();
		token.cancelled().await;
		token2.cancelled().await;
		assert!(token.is_cancelled());
		assert!(token2.is_cancelled());
	}
}
