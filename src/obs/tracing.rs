// self
use crate::{_prelude::*, obs::Operation};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type Instrumented<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type Instrumented<F> = F;

/// A span builder used by the request pipeline.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a span for a backend request.
	pub fn request(method: &Method, url: &Url) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"busline_client.request",
				operation = Operation::Request.as_str(),
				method = %method,
				path = url.path(),
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, url);

			Self {}
		}
	}

	/// Creates a span for a refresh call.
	pub fn refresh() -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"busline_client.refresh",
				operation = Operation::Refresh.as_str()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = Operation::Refresh;

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Notes that a request parked behind another request's refresh.
pub fn note_parked(parked: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(parked, "Request parked behind in-flight refresh.");
	#[cfg(not(feature = "tracing"))]
	let _ = parked;
}

/// Notes that a request is replayed with a new access token.
pub fn note_replay(token_fingerprint: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(token = token_fingerprint, "Replaying request with refreshed access token.");
	#[cfg(not(feature = "tracing"))]
	let _ = token_fingerprint;
}

/// Notes a successful refresh and how many parked requests it released.
pub fn note_refreshed(token_fingerprint: &str, released: usize) {
	#[cfg(feature = "tracing")]
	tracing::info!(token = token_fingerprint, released, "Access token refreshed.");
	#[cfg(not(feature = "tracing"))]
	let _ = (token_fingerprint, released);
}

/// Notes that the session was torn down after a failed refresh.
pub fn note_session_expired(error: &dyn StdError, redirect_to: &str, rejected: usize) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		error = %error,
		redirect_to,
		rejected,
		"Refresh failed; session credentials cleared."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (error, redirect_to, rejected);
}

/// Notes that the credentials could not be deleted while ending the session.
pub fn note_teardown_failed(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	tracing::error!(error = %error, "Session credentials could not be cleared.");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn helpers_are_noops_without_subscriber() {
		note_parked(2);
		note_replay("abc");
		note_refreshed("abc", 2);
		note_session_expired(&std::fmt::Error, "/", 0);
		note_teardown_failed(&std::fmt::Error);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let url = Url::parse("https://api.busline.example/api/v1/trips")
			.expect("Fixture URL should parse.");
		let span = OperationSpan::request(&Method::GET, &url);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, OperationSpan::refresh().instrument(async { 42 }).await);
	}
}
