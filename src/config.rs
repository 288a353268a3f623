//! Validated client configuration and its builder.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// The base URL cannot carry paths (e.g. `mailto:`).
	#[error("Base URL `{url}` cannot be used as a base.")]
	InvalidBaseUrl {
		/// URL that failed validation.
		url: String,
	},
	/// Plain HTTP was supplied without opting in.
	#[error("The base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// URL that failed validation.
		url: String,
	},
	/// The refresh path must be an absolute path on the backend.
	#[error("Refresh path must start with `/`: {path}.")]
	InvalidRefreshPath {
		/// Path that failed validation.
		path: String,
	},
	/// The redirect target must be an absolute application route.
	#[error("Redirect target must start with `/`: {target}.")]
	InvalidRedirectTarget {
		/// Route that failed validation.
		target: String,
	},
	/// Timeouts must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
	/// Preemptive windows cannot be negative.
	#[error("Preemptive refresh window cannot be negative.")]
	NegativePreemptiveWindow,
	/// Configuration text could not be parsed.
	#[error("Configuration could not be parsed: {message}.")]
	Parse {
		/// Parser error message, including the failing path.
		message: String,
	},
}

/// Immutable configuration consumed by [`SessionClient`](crate::client::SessionClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Backend origin every relative request path is resolved against.
	pub base_url: Url,
	/// Path of the refresh endpoint.
	#[serde(default = "ClientConfig::default_refresh_path")]
	pub refresh_path: String,
	/// Default per-request timeout.
	#[serde(default = "ClientConfig::default_request_timeout", with = "duration_secs")]
	pub request_timeout: Duration,
	/// Application route the host should navigate to once the session expires.
	#[serde(default = "ClientConfig::default_redirect_target")]
	pub redirect_target: String,
	/// User-facing message delivered with the session-expired notification.
	#[serde(default = "ClientConfig::default_session_expired_message")]
	pub session_expired_message: String,
	/// Refresh ahead of time when a JWT access token expires within this window.
	///
	/// Meant to be shorter than the access-token lifetime. At most one preemptive refresh
	/// runs per window; tokens that live shorter than it fall back to `401` recovery.
	#[serde(default, with = "duration_secs::option")]
	pub preemptive_window: Option<Duration>,
	/// Accept `http://` base URLs (local development only).
	#[serde(default)]
	pub allow_insecure_http: bool,
}
impl ClientConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/api/v1/auth/refresh-token";
	/// Default redirect target after session expiry.
	pub const DEFAULT_REDIRECT_TARGET: &'static str = "/";
	/// Default per-request timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(10);
	/// Default session-expired message.
	pub const DEFAULT_SESSION_EXPIRED_MESSAGE: &'static str =
		"Your session has expired. Please sign in again.";

	/// Creates a new builder for the provided backend origin.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(raw: &str) -> Result<Self, ClientConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|e| ClientConfigError::Parse { message: e.to_string() })?;

		config.validate()?;

		Ok(config)
	}

	/// Resolves `path` (relative or absolute) against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
		self.base_url.join(path)
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, url::ParseError> {
		self.resolve(&self.refresh_path)
	}

	fn validate(&self) -> Result<(), ClientConfigError> {
		if self.base_url.cannot_be_a_base() {
			return Err(ClientConfigError::InvalidBaseUrl { url: self.base_url.to_string() });
		}

		match self.base_url.scheme() {
			"https" => {},
			"http" if self.allow_insecure_http => {},
			"http" =>
				return Err(ClientConfigError::InsecureBaseUrl { url: self.base_url.to_string() }),
			_ => return Err(ClientConfigError::InvalidBaseUrl { url: self.base_url.to_string() }),
		}

		if !self.refresh_path.starts_with('/') {
			return Err(ClientConfigError::InvalidRefreshPath { path: self.refresh_path.clone() });
		}
		if !self.redirect_target.starts_with('/') {
			return Err(ClientConfigError::InvalidRedirectTarget {
				target: self.redirect_target.clone(),
			});
		}
		if !self.request_timeout.is_positive() {
			return Err(ClientConfigError::NonPositiveTimeout);
		}
		if self.preemptive_window.is_some_and(|window| window.is_negative()) {
			return Err(ClientConfigError::NegativePreemptiveWindow);
		}

		Ok(())
	}

	fn default_refresh_path() -> String {
		Self::DEFAULT_REFRESH_PATH.into()
	}

	fn default_request_timeout() -> Duration {
		Self::DEFAULT_REQUEST_TIMEOUT
	}

	fn default_redirect_target() -> String {
		Self::DEFAULT_REDIRECT_TARGET.into()
	}

	fn default_session_expired_message() -> String {
		Self::DEFAULT_SESSION_EXPIRED_MESSAGE.into()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	config: ClientConfig,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults for everything but the base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			config: ClientConfig {
				base_url,
				refresh_path: ClientConfig::default_refresh_path(),
				request_timeout: ClientConfig::DEFAULT_REQUEST_TIMEOUT,
				redirect_target: ClientConfig::default_redirect_target(),
				session_expired_message: ClientConfig::default_session_expired_message(),
				preemptive_window: None,
				allow_insecure_http: false,
			},
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.refresh_path = path.into();

		self
	}

	/// Overrides the default per-request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;

		self
	}

	/// Overrides the route hosts navigate to after session expiry.
	pub fn redirect_target(mut self, target: impl Into<String>) -> Self {
		self.config.redirect_target = target.into();

		self
	}

	/// Overrides the user-facing session-expired message.
	pub fn session_expired_message(mut self, message: impl Into<String>) -> Self {
		self.config.session_expired_message = message.into();

		self
	}

	/// Enables refreshing JWT access tokens that expire within `window`.
	///
	/// Pick a window shorter than the access-token lifetime; see
	/// [`ClientConfig::preemptive_window`].
	pub fn preemptive_window(mut self, window: Duration) -> Self {
		self.config.preemptive_window = Some(window);

		self
	}

	/// Allows `http://` base URLs.
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.config.allow_insecure_http = allow;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

mod duration_secs {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_f64(value.as_seconds_f64())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = f64::deserialize(deserializer)?;

		Duration::checked_seconds_f64(secs)
			.ok_or_else(|| serde::de::Error::custom("duration must be a finite number of seconds"))
	}

	pub mod option {
		// crates.io
		use serde::{Deserializer, Serializer};
		// self
		use crate::_prelude::*;

		pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match value {
				Some(value) => super::serialize(value, serializer),
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
		where
			D: Deserializer<'de>,
		{
			match <Option<f64>>::deserialize(deserializer)? {
				Some(secs) => Duration::checked_seconds_f64(secs).map(Some).ok_or_else(|| {
					serde::de::Error::custom("duration must be a finite number of seconds")
				}),
				None => Ok(None),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://api.busline.example").expect("Fixture URL should parse.")
	}

	#[test]
	fn defaults_match_backend_contract() {
		let config = ClientConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(config.refresh_path, "/api/v1/auth/refresh-token");
		assert_eq!(config.redirect_target, "/");
		assert_eq!(config.request_timeout, Duration::seconds(10));
		assert_eq!(config.preemptive_window, None);
		assert_eq!(
			config.refresh_url().expect("Refresh URL should resolve.").as_str(),
			"https://api.busline.example/api/v1/auth/refresh-token"
		);
	}

	#[test]
	fn rejects_plain_http_unless_allowed() {
		let url = Url::parse("http://localhost:8080").expect("Fixture URL should parse.");

		assert!(matches!(
			ClientConfig::builder(url.clone()).build(),
			Err(ClientConfigError::InsecureBaseUrl { .. })
		));
		assert!(ClientConfig::builder(url).allow_insecure_http(true).build().is_ok());
	}

	#[test]
	fn rejects_invalid_values() {
		assert_eq!(
			ClientConfig::builder(base()).refresh_path("auth/refresh").build(),
			Err(ClientConfigError::InvalidRefreshPath { path: "auth/refresh".into() })
		);
		assert_eq!(
			ClientConfig::builder(base()).redirect_target("login").build(),
			Err(ClientConfigError::InvalidRedirectTarget { target: "login".into() })
		);
		assert_eq!(
			ClientConfig::builder(base()).request_timeout(Duration::ZERO).build(),
			Err(ClientConfigError::NonPositiveTimeout)
		);
		assert_eq!(
			ClientConfig::builder(base()).preemptive_window(Duration::seconds(-1)).build(),
			Err(ClientConfigError::NegativePreemptiveWindow)
		);
		assert!(matches!(
			ClientConfig::builder(Url::parse("ftp://files.example").expect("URL should parse."))
				.build(),
			Err(ClientConfigError::InvalidBaseUrl { .. })
		));
	}

	#[test]
	fn parses_json_with_defaults() {
		let config = ClientConfig::from_json(
			r#"{
				"base_url": "https://api.busline.example",
				"request_timeout": 2.5,
				"preemptive_window": 30
			}"#,
		)
		.expect("JSON configuration should parse.");

		assert_eq!(config.request_timeout, Duration::milliseconds(2500));
		assert_eq!(config.preemptive_window, Some(Duration::seconds(30)));
		assert_eq!(config.refresh_path, ClientConfig::DEFAULT_REFRESH_PATH);
		assert_eq!(config.session_expired_message, ClientConfig::DEFAULT_SESSION_EXPIRED_MESSAGE);
	}

	#[test]
	fn json_errors_name_the_field() {
		let err = ClientConfig::from_json(
			r#"{ "base_url": "https://a.example", "request_timeout": "soon" }"#,
		)
		.expect_err("Non-numeric timeout should fail.");

		match err {
			ClientConfigError::Parse { message } => assert!(message.contains("request_timeout")),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn json_is_validated() {
		assert!(matches!(
			ClientConfig::from_json(r#"{ "base_url": "http://a.example" }"#),
			Err(ClientConfigError::InsecureBaseUrl { .. })
		));
	}
}
