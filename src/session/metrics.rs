//! Counters describing refresh activity across every clone of a client.

// std
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSnapshot {
	/// Calls made to the refresh endpoint.
	pub attempts: u64,
	/// Refresh calls that produced a new access token.
	pub successes: u64,
	/// Refresh calls that ended the session.
	pub failures: u64,
	/// Requests that waited on another request's refresh.
	pub parked: u64,
	/// Rejected requests replayed with a token some other request had already stored.
	pub reused: u64,
}

/// Session-wide refresh counters, shared by every clone of a client.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	parked: AtomicU64,
	reused: AtomicU64,
}
impl RefreshMetrics {
	/// Calls made to the refresh endpoint.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Relaxed)
	}

	/// Refresh calls that produced a new access token.
	pub fn successes(&self) -> u64 {
		self.successes.load(Relaxed)
	}

	/// Refresh calls that ended the session.
	pub fn failures(&self) -> u64 {
		self.failures.load(Relaxed)
	}

	/// Requests that waited on another request's refresh.
	pub fn parked(&self) -> u64 {
		self.parked.load(Relaxed)
	}

	/// Rejected requests replayed with an already-stored newer token.
	pub fn reused(&self) -> u64 {
		self.reused.load(Relaxed)
	}

	/// Reads every counter at once.
	pub fn snapshot(&self) -> RefreshSnapshot {
		RefreshSnapshot {
			attempts: self.attempts(),
			successes: self.successes(),
			failures: self.failures(),
			parked: self.parked(),
			reused: self.reused(),
		}
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_parked(&self) {
		self.parked.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_reused(&self) {
		self.reused.fetch_add(1, Relaxed);
	}
}
