//! Client-level error types shared across the request pipeline, refresh flow, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Backend answered with a non-success status.
	#[error(transparent)]
	Status(#[from] StatusError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// No session credentials are stored.
	#[error("No session credentials are stored.")]
	NotSignedIn,
	/// Token refresh failed; the session has been torn down.
	///
	/// The same shared error is delivered to the request that performed the refresh and to
	/// every request parked behind it.
	#[error("Session refresh failed: {0}")]
	Refresh(#[source] Arc<RefreshError>),
}
impl Error {
	/// Returns the HTTP status carried by a [`StatusError`], if any.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Status(e) => Some(e.status),
			_ => None,
		}
	}

	/// Returns `true` when the backend rejected the request with `401 Unauthorized`.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(StatusCode::UNAUTHORIZED)
	}

	/// Returns the shared refresh failure, if this error originates from one.
	pub fn refresh_error(&self) -> Option<&Arc<RefreshError>> {
		match self {
			Self::Refresh(e) => Some(e),
			_ => None,
		}
	}
}

/// Configuration and request-construction failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path cannot be resolved against the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending path or URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header value contains characters HTTP does not allow.
	#[error("Header value is invalid.")]
	InvalidHeader(#[from] ::http::header::InvalidHeaderValue),
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Body(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its timeout.
	#[error("Request timed out while calling the backend.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Non-success response surfaced to the caller unchanged.
#[derive(Clone, Debug, ThisError)]
#[error("Backend responded with {status}.")]
pub struct StatusError {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl StatusError {
	/// Lossy UTF-8 view of the response body, handy for error messages.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Response body did not match the expected JSON shape.
#[derive(Debug, ThisError)]
#[error("Response body could not be decoded.")]
pub struct DecodeError {
	/// Structured parsing failure with the JSON path that failed.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
	/// HTTP status of the decoded response.
	pub status: StatusCode,
}

/// Failure of the single coordinated refresh call.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// An access token exists but no refresh token is stored.
	#[error("No refresh token is stored for this session.")]
	MissingRefreshToken,
	/// The refresh request could not be built.
	#[error(transparent)]
	Request(ConfigError),
	/// The refresh endpoint could not be reached.
	#[error(transparent)]
	Transport(TransportError),
	/// The refresh endpoint rejected the refresh token.
	#[error("Refresh endpoint rejected the refresh token with {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: StatusCode,
		/// Raw response body.
		body: String,
	},
	/// The refresh endpoint returned a body without a usable access token.
	#[error("Refresh endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The refresh endpoint answered without an access token.
	#[error("Refresh endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// The refreshed credentials could not be persisted.
	#[error("Refreshed credentials could not be stored: {0}")]
	Storage(#[source] crate::store::StoreError),
	/// The request performing the refresh was dropped before it finished.
	#[error("Refresh was abandoned before completing.")]
	Aborted,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "cookie jar unreadable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("cookie jar unreadable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn status_helpers_report_unauthorized() {
		let error = Error::from(StatusError {
			status: StatusCode::UNAUTHORIZED,
			headers: HeaderMap::new(),
			body: b"{\"message\":\"jwt expired\"}".to_vec(),
		});

		assert!(error.is_unauthorized());
		assert_eq!(error.status(), Some(StatusCode::UNAUTHORIZED));
		assert!(error.refresh_error().is_none());
	}

	#[test]
	fn refresh_error_is_shared_and_sourced() {
		let shared = Arc::new(RefreshError::Rejected {
			status: StatusCode::UNAUTHORIZED,
			body: "invalid refresh token".into(),
		});
		let error = Error::Refresh(shared.clone());

		assert!(Arc::ptr_eq(error.refresh_error().expect("Refresh error should be set."), &shared));
		assert!(StdError::source(&error).is_some());
		assert_eq!(error.status(), None);
	}
}
