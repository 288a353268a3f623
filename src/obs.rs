//! Optional observability helpers for the request pipeline and refresh flow.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to wrap requests and refreshes in spans named `busline_client.request`
//!   and `busline_client.refresh` (with `method` and `path` fields on requests) and to emit
//!   events for parked requests, replays, and session expiry. Token values never appear in
//!   events; fingerprints may.
//! - Enable `metrics` to increment `busline_client_request_total` and
//!   `busline_client_refresh_total`, labeled by `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// A caller-issued backend request, including its replay.
	Request,
	/// A call to the refresh endpoint.
	Refresh,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Request => "request",
			Operation::Refresh => "refresh",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to the operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Request waited on another request's refresh.
	Parked,
	/// Request was replayed with a new access token.
	Replayed,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Parked => "parked",
			Outcome::Replayed => "replayed",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
