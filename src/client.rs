//! Authenticated request pipeline.
//!
//! [`SessionClient`] attaches the stored access token to every outbound request. A `401`
//! on a request that has not been replayed yet triggers the coordinated refresh in
//! [`refresh`]; the request is then replayed once with the new token. Any other status,
//! and any second `401`, reaches the caller unchanged.

pub mod refresh;

// crates.io
use ::http::HeaderMap;
use serde::Serialize;
// self
use crate::{
	_prelude::*,
	auth::{self, CredentialKey, Credentials, TokenSecret},
	client::refresh::RefreshReason,
	config::ClientConfig,
	error::ConfigError,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, Operation, OperationSpan, Outcome},
	session::{NoopSessionObserver, RefreshCoordinator, RefreshMetrics, SessionObserver},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Session client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestTransport>;

/// HTTP client that keeps a bearer-token session alive across access-token expiry.
///
/// Cloning is cheap; clones share the transport, the credential store, the observer, and
/// the refresh coordinator, so concurrent requests issued through any clone still trigger
/// at most one refresh call at a time.
pub struct SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Validated configuration.
	pub config: Arc<ClientConfig>,
	/// Transport used for backend calls and refresh calls alike.
	pub transport: Arc<T>,
	/// Store holding the access and refresh tokens.
	pub store: Arc<dyn CredentialStore>,
	/// Shared counters for refresh activity.
	pub refresh_metrics: Arc<RefreshMetrics>,
	observer: Arc<dyn SessionObserver>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
	) -> Self {
		Self {
			config: Arc::new(config),
			transport: transport.into(),
			store,
			refresh_metrics: Default::default(),
			observer: Arc::new(NoopSessionObserver),
			coordinator: Default::default(),
		}
	}

	/// Sets the observer notified when a failed refresh ends the session.
	pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
		self.observer = observer;

		self
	}

	/// Coordinator tracking the in-flight refresh, shared by every clone.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Stores a fresh pair of credentials, e.g. after the sign-in call succeeded.
	pub async fn sign_in(&self, credentials: Credentials) -> Result<()> {
		<dyn CredentialStore>::save(self.store.as_ref(), credentials).await?;
		self.coordinator.reset();

		Ok(())
	}

	/// Deletes both credentials without notifying the observer.
	pub async fn sign_out(&self) -> Result<()> {
		<dyn CredentialStore>::clear(self.store.as_ref()).await?;

		Ok(())
	}

	/// Reads the credentials currently held by the store.
	pub async fn credentials(&self) -> Result<Credentials> {
		Ok(<dyn CredentialStore>::load(self.store.as_ref()).await?)
	}

	/// Builds a request for `path`, resolved against the configured base URL.
	///
	/// Absolute URLs are used as-is. The configured request timeout is attached so every
	/// transport honors it.
	pub fn build_request(&self, method: Method, path: &str) -> Result<ApiRequest> {
		let url = self
			.config
			.resolve(path)
			.map_err(|source| ConfigError::InvalidUrl { url: path.to_owned(), source })?;

		Ok(ApiRequest::new(method, url).with_timeout(self.config.request_timeout))
	}

	/// Issues a request with an optional JSON body and optional extra headers.
	pub async fn request<B>(
		&self,
		method: Method,
		path: &str,
		body: Option<&B>,
		headers: Option<HeaderMap>,
	) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		let mut request = self.build_request(method, path)?;

		if let Some(body) = body {
			request = request.with_json(body)?;
		}
		if let Some(headers) = headers {
			request = request.with_headers(headers);
		}

		self.send(request).await
	}

	/// Issues a `GET` request.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.send(self.build_request(Method::GET, path)?).await
	}

	/// Issues a `POST` request with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(Method::POST, path, Some(body), None).await
	}

	/// Issues a `PUT` request with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(Method::PUT, path, Some(body), None).await
	}

	/// Issues a `PATCH` request with a JSON body.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(Method::PATCH, path, Some(body), None).await
	}

	/// Issues a `DELETE` request.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(self.build_request(Method::DELETE, path)?).await
	}

	/// Sends a prepared request through the authentication pipeline.
	///
	/// Non-2xx responses surface as [`Error::Status`]; transport failures as
	/// [`Error::Transport`]; a failed refresh as [`Error::Refresh`].
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const OPERATION: Operation = Operation::Request;

		let span = OperationSpan::request(&request.method, &request.url);

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span.instrument(self.dispatch(request)).await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	async fn dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		let mut token = self.store.get(CredentialKey::AccessToken).await?;

		if let Some(sent) = self.expiring_token(token.as_ref()).await? {
			let reason = RefreshReason::Stale { sent: Some(sent) };

			token = Some(self.refreshed_access_token(reason).await?);
		}
		if let Some(token) = &token {
			request.set_bearer(token)?;
		}

		let response = self.transport.send(request.clone()).await?;

		if response.status != StatusCode::UNAUTHORIZED || request.is_retried() {
			return Ok(response.into_result()?);
		}

		self.recover(request, response).await
	}

	async fn recover(&self, mut request: ApiRequest, rejected: ApiResponse) -> Result<ApiResponse> {
		if self.credentials().await?.is_empty() {
			return Ok(rejected.into_result()?);
		}

		let sent = request.bearer_token().map(TokenSecret::new);

		if sent.as_ref().is_some_and(|sent| self.coordinator.is_retired(sent)) {
			return Ok(rejected.into_result()?);
		}

		request.mark_retried();

		let sent = sent.map(|sent| sent.expose().to_owned());
		let token = self.refreshed_access_token(RefreshReason::Stale { sent }).await?;

		request.set_bearer(&token)?;
		obs::note_replay(&token.fingerprint());
		obs::record_outcome(Operation::Request, Outcome::Replayed);

		let response = self.transport.send(request).await?;

		Ok(response.into_result()?)
	}

	/// Returns the access token when it should be refreshed before it is sent.
	///
	/// At most one preemptive refresh runs per window: right after a refresh the token is
	/// sent as-is, even if the backend issued one that lives shorter than the window.
	async fn expiring_token(&self, token: Option<&TokenSecret>) -> Result<Option<String>> {
		let (Some(window), Some(token)) = (self.config.preemptive_window, token) else {
			return Ok(None);
		};
		let now = OffsetDateTime::now_utc();
		let refreshed_recently =
			self.coordinator.last_refreshed_at().is_some_and(|at| now - at < window);

		if refreshed_recently
			|| self.coordinator.is_retired(token)
			|| !auth::expires_within(token, now, window)
			|| self.store.get(CredentialKey::RefreshToken).await?.is_none()
		{
			return Ok(None);
		}

		Ok(Some(token.expose().to_owned()))
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestTransport> {
	/// Creates a client backed by a reqwest transport built from `config`.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, transport, store))
	}
}
impl<T> Clone for SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			observer: self.observer.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_path", &self.config.refresh_path)
			.field("refreshing", &self.coordinator.is_refreshing())
			.finish()
	}
}
