//! Shared refresh state and the session-expired notification port.
//!
//! [`RefreshCoordinator`] owns the "refresh in progress" mark and the ordered list of
//! requests parked behind it, so exactly one refresh call is in flight at any time.
//! [`SessionObserver`] is how the hosting application learns that the session is gone;
//! the client never renders or navigates on its own.

pub mod coordinator;
pub mod metrics;

pub use coordinator::*;
pub use metrics::{RefreshMetrics, RefreshSnapshot};

// self
use crate::{_prelude::*, error::RefreshError, store::StoreError};

/// Notification delivered once per failed refresh.
#[derive(Clone, Debug)]
pub struct SessionExpired {
	/// User-facing message, e.g. for a toast.
	pub message: String,
	/// Application route the host should navigate to.
	pub redirect_to: String,
	/// Refresh failure that ended the session.
	pub error: Arc<RefreshError>,
	/// Set when the store failed to delete a credential during teardown.
	///
	/// The client no longer refreshes with what is left behind, but the host may want to
	/// purge its storage by other means.
	pub teardown_error: Option<StoreError>,
}

/// Port through which the hosting application reacts to session expiry.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Called exactly once per failed refresh, after the credentials were deleted.
	fn session_expired(&self, event: &SessionExpired);
}

/// Observer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSessionObserver;
impl SessionObserver for NoopSessionObserver {
	fn session_expired(&self, _event: &SessionExpired) {}
}

/// Adapts a closure into a [`SessionObserver`].
pub struct FnSessionObserver<F>(pub F);
impl<F> SessionObserver for FnSessionObserver<F>
where
	F: Send + Sync + Fn(&SessionExpired),
{
	fn session_expired(&self, event: &SessionExpired) {
		(self.0)(event)
	}
}
impl<F> Debug for FnSessionObserver<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnSessionObserver(..)")
	}
}
