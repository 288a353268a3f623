//! Single-flight refresh coordination.
//!
//! The first request to need a refresh becomes the leader and receives a
//! [`RefreshLease`]; every request that needs one while the lease is outstanding parks on
//! a [`RefreshWaiter`]. Resolving the lease clears the in-progress mark and wakes every
//! waiter, in registration order, with the same outcome. All state sits behind one mutex
//! that is never held across an `.await`.

// std
use std::task::{Context, Poll};
// crates.io
use futures::channel::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret, error::RefreshError};

/// Outcome shared with every request parked on a refresh.
pub type RefreshOutcome = Result<TokenSecret, Arc<RefreshError>>;

#[derive(Debug, Default)]
struct RefreshState {
	refreshing: bool,
	waiters: Vec<oneshot::Sender<RefreshOutcome>>,
	last_refreshed_at: Option<OffsetDateTime>,
	retired: Option<String>,
}

/// Owner of the "refresh in progress" mark and the FIFO waiter list.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
}
impl RefreshCoordinator {
	/// Claims the refresh, or parks on the one already in flight.
	///
	/// The check and the claim happen under one lock, so two callers can never both
	/// become leader.
	pub fn begin_refresh(&self) -> RefreshRole<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			RefreshRole::Follower(Self::park(&mut state))
		} else {
			state.refreshing = true;

			RefreshRole::Leader(RefreshLease { coordinator: self, resolved: false })
		}
	}

	/// Returns `true` while a lease is outstanding.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Parks on the in-flight refresh, if there is one.
	pub fn await_refresh(&self) -> Option<RefreshWaiter> {
		let mut state = self.state.lock();

		state.refreshing.then(|| Self::park(&mut state))
	}

	/// Number of requests currently parked.
	pub fn parked(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// When the last successful refresh resolved, if any has.
	pub fn last_refreshed_at(&self) -> Option<OffsetDateTime> {
		self.state.lock().last_refreshed_at
	}

	/// Returns `true` for an access token left behind by a session that has already ended.
	///
	/// Such a token still sits in the store only because deleting it failed; a `401` on
	/// it is surfaced as-is instead of starting another refresh.
	pub fn is_retired(&self, token: &TokenSecret) -> bool {
		self.state.lock().retired.as_deref() == Some(token.fingerprint().as_str())
	}

	/// Marks `token` as belonging to an ended session.
	pub(crate) fn retire(&self, token: &TokenSecret) {
		self.state.lock().retired = Some(token.fingerprint());
	}

	/// Forgets the retired token, e.g. once a new session was signed in.
	pub(crate) fn reset(&self) {
		self.state.lock().retired = None;
	}

	fn park(state: &mut RefreshState) -> RefreshWaiter {
		let (tx, rx) = oneshot::channel();

		state.waiters.push(tx);

		RefreshWaiter(rx)
	}

	fn finish(&self, outcome: RefreshOutcome) -> usize {
		let waiters = {
			let mut state = self.state.lock();

			state.refreshing = false;

			if outcome.is_ok() {
				state.last_refreshed_at = Some(OffsetDateTime::now_utc());
			}

			std::mem::take(&mut state.waiters)
		};
		let mut delivered = 0;

		for waiter in waiters {
			if waiter.send(outcome.clone()).is_ok() {
				delivered += 1;
			}
		}

		delivered
	}
}

/// Result of [`RefreshCoordinator::begin_refresh`].
#[derive(Debug)]
pub enum RefreshRole<'a> {
	/// The caller must perform the refresh call and resolve the lease.
	Leader(RefreshLease<'a>),
	/// Another caller is refreshing; await the waiter for its outcome.
	Follower(RefreshWaiter),
}

/// Leader's obligation to resolve the in-flight refresh.
///
/// Dropping an unresolved lease (for instance because the leader's future was cancelled)
/// clears the in-progress mark and rejects every waiter with [`RefreshError::Aborted`].
#[derive(Debug)]
pub struct RefreshLease<'a> {
	coordinator: &'a RefreshCoordinator,
	resolved: bool,
}
impl RefreshLease<'_> {
	/// Publishes the new access token to every parked request.
	///
	/// Returns how many parked requests were still waiting.
	pub fn complete(mut self, token: TokenSecret) -> usize {
		self.resolved = true;

		self.coordinator.finish(Ok(token))
	}

	/// Rejects every parked request with the shared refresh error.
	///
	/// Returns how many parked requests were still waiting.
	pub fn fail(mut self, error: Arc<RefreshError>) -> usize {
		self.resolved = true;

		self.coordinator.finish(Err(error))
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if !self.resolved {
			self.coordinator.finish(Err(Arc::new(RefreshError::Aborted)));
		}
	}
}

/// Future resolving to the outcome of the refresh a request is parked on.
#[derive(Debug)]
pub struct RefreshWaiter(oneshot::Receiver<RefreshOutcome>);
impl Future for RefreshWaiter {
	type Output = RefreshOutcome;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.0)
			.poll(cx)
			.map(|received| received.unwrap_or_else(|_| Err(Arc::new(RefreshError::Aborted))))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn leader(role: RefreshRole<'_>) -> RefreshLease<'_> {
		match role {
			RefreshRole::Leader(lease) => lease,
			RefreshRole::Follower(_) => panic!("Expected to lead the refresh."),
		}
	}

	fn follower(role: RefreshRole<'_>) -> RefreshWaiter {
		match role {
			RefreshRole::Follower(waiter) => waiter,
			RefreshRole::Leader(_) => panic!("Expected to follow the refresh."),
		}
	}

	#[test]
	fn only_one_leader_at_a_time() {
		let coordinator = RefreshCoordinator::default();

		assert!(!coordinator.is_refreshing());
		assert!(coordinator.await_refresh().is_none());

		let lease = leader(coordinator.begin_refresh());

		assert!(coordinator.is_refreshing());

		let _waiter = follower(coordinator.begin_refresh());

		assert_eq!(coordinator.parked(), 1);
		assert_eq!(lease.complete(TokenSecret::new("t2")), 1);
		assert!(!coordinator.is_refreshing());
		assert_eq!(coordinator.parked(), 0);

		let _next = leader(coordinator.begin_refresh());
	}

	#[tokio::test]
	async fn waiters_receive_new_token_in_registration_order() {
		let coordinator = RefreshCoordinator::default();
		let lease = leader(coordinator.begin_refresh());
		let order = Arc::new(Mutex::new(Vec::new()));
		let mut handles = Vec::new();

		for idx in 0..3 {
			let waiter = coordinator.await_refresh().expect("Refresh should be in flight.");
			let order = order.clone();

			handles.push(async move {
				let token = waiter.await.expect("Refresh should succeed.");

				order.lock().push(idx);

				token
			});
		}

		assert_eq!(lease.complete(TokenSecret::new("fresh")), 3);

		let tokens = futures::future::join_all(handles).await;

		assert!(tokens.iter().all(|token| token.expose() == "fresh"));
		assert_eq!(*order.lock(), vec![0, 1, 2]);
	}

	#[tokio::test]
	async fn failure_is_shared_with_every_waiter() {
		let coordinator = RefreshCoordinator::default();
		let lease = leader(coordinator.begin_refresh());
		let first = follower(coordinator.begin_refresh());
		let second = follower(coordinator.begin_refresh());
		let error = Arc::new(RefreshError::MissingRefreshToken);

		assert_eq!(lease.fail(error.clone()), 2);

		for waiter in [first, second] {
			let received = waiter.await.expect_err("Waiters should observe the failure.");

			assert!(Arc::ptr_eq(&received, &error));
		}

		assert!(!coordinator.is_refreshing());
	}

	#[tokio::test]
	async fn dropped_lease_aborts_waiters() {
		let coordinator = RefreshCoordinator::default();
		let lease = leader(coordinator.begin_refresh());
		let waiter = follower(coordinator.begin_refresh());

		drop(lease);

		let received = waiter.await.expect_err("Abandoned refresh should reject waiters.");

		assert!(matches!(*received, RefreshError::Aborted));
		assert!(!coordinator.is_refreshing());
	}

	#[test]
	fn successful_refresh_is_timestamped() {
		let coordinator = RefreshCoordinator::default();

		leader(coordinator.begin_refresh()).fail(Arc::new(RefreshError::MissingRefreshToken));

		assert!(coordinator.last_refreshed_at().is_none());

		let before = OffsetDateTime::now_utc();

		leader(coordinator.begin_refresh()).complete(TokenSecret::new("t"));

		let stamped = coordinator.last_refreshed_at().expect("Success should be timestamped.");

		assert!(stamped >= before);
	}

	#[test]
	fn retired_token_is_recognized_until_reset() {
		let coordinator = RefreshCoordinator::default();
		let dead = TokenSecret::new("access-1");

		assert!(!coordinator.is_retired(&dead));

		coordinator.retire(&dead);

		assert!(coordinator.is_retired(&dead));
		assert!(!coordinator.is_retired(&TokenSecret::new("access-2")));

		coordinator.reset();

		assert!(!coordinator.is_retired(&dead));
	}

	#[test]
	fn dropped_waiters_are_not_counted() {
		let coordinator = RefreshCoordinator::default();
		let lease = leader(coordinator.begin_refresh());

		drop(follower(coordinator.begin_refresh()));

		let _kept = follower(coordinator.begin_refresh());

		assert_eq!(lease.complete(TokenSecret::new("t")), 1);
	}
}
