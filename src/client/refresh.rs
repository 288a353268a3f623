//! Single-flight refresh of the access token and session teardown.
//!
//! The request that claims the [`RefreshLease`] calls the refresh endpoint on behalf of every
//! request that hits a `401` while the call is in flight. On success the new access token
//! (and a rotated refresh token, when the backend sends one) is stored before any parked
//! request is released. On failure both credentials are deleted, every parked request is
//! rejected with the same error, and the observer hears about it exactly once.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
	client::SessionClient,
	error::{ConfigError, RefreshError},
	http::{ApiRequest, HttpTransport},
	obs::{self, Operation, OperationSpan, Outcome},
	session::{RefreshLease, RefreshRole, SessionExpired},
	store::{CredentialStore, StoreError},
};

/// Why a caller needs a new access token.
#[derive(Clone, Debug)]
pub(crate) enum RefreshReason {
	/// `sent` was rejected or is about to expire. A different token already in the store
	/// is used as-is instead of calling the refresh endpoint.
	Stale { sent: Option<String> },
	/// Call the refresh endpoint regardless of the stored access token.
	Forced,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshTokenResponse {
	data: RefreshedTokens,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshedTokens {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
}

impl<T> SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Exchanges the stored refresh token for a new access token right away.
	///
	/// Joins the refresh already in flight if there is one. A failure ends the session
	/// exactly like a failed `401` recovery does.
	pub async fn refresh_now(&self) -> Result<TokenSecret> {
		if self.credentials().await?.is_empty() {
			return Err(Error::NotSignedIn);
		}

		self.refreshed_access_token(RefreshReason::Forced).await
	}

	/// Leads a refresh, or parks until the one in flight resolves.
	pub(crate) async fn refreshed_access_token(
		&self,
		reason: RefreshReason,
	) -> Result<TokenSecret> {
		match self.coordinator.begin_refresh() {
			RefreshRole::Leader(lease) => self.lead_refresh(lease, reason).await,
			RefreshRole::Follower(waiter) => {
				self.refresh_metrics.record_parked();
				obs::record_outcome(Operation::Request, Outcome::Parked);
				obs::note_parked(self.coordinator.parked());

				waiter.await.map_err(Error::Refresh)
			},
		}
	}

	async fn lead_refresh(
		&self,
		lease: RefreshLease<'_>,
		reason: RefreshReason,
	) -> Result<TokenSecret> {
		const OPERATION: Operation = Operation::Refresh;

		if let RefreshReason::Stale { sent } = &reason {
			let current = self
				.store
				.get(CredentialKey::AccessToken)
				.await?
				.filter(|current| Some(current.expose()) != sent.as_deref());

			if let Some(current) = current {
				self.refresh_metrics.record_reused();
				lease.complete(current.clone());

				return Ok(current);
			}
		}

		let span = OperationSpan::refresh();

		obs::record_outcome(OPERATION, Outcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				match self.exchange_refresh_token().await {
					Ok(token) => {
						let released = lease.complete(token.clone());

						self.refresh_metrics.record_success();
						obs::note_refreshed(&token.fingerprint(), released);

						Ok(token)
					},
					Err(e) => Err(self.end_session(lease, e).await),
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	/// Calls the refresh endpoint and stores what it returns.
	async fn exchange_refresh_token(&self) -> Result<TokenSecret, RefreshError> {
		let refresh_token = self
			.store
			.get(CredentialKey::RefreshToken)
			.await
			.map_err(RefreshError::Storage)?
			.ok_or(RefreshError::MissingRefreshToken)?;
		let url = self.config.refresh_url().map_err(|source| {
			RefreshError::Request(ConfigError::InvalidUrl {
				url: self.config.refresh_path.clone(),
				source,
			})
		})?;
		let request = ApiRequest::new(Method::POST, url)
			.with_timeout(self.config.request_timeout)
			.with_json(&RefreshTokenRequest { refresh_token: refresh_token.expose() })
			.map_err(RefreshError::Request)?;
		let response = self.transport.send(request).await.map_err(RefreshError::Transport)?;

		if !response.is_success() {
			return Err(RefreshError::Rejected { status: response.status, body: response.text() });
		}

		let RefreshTokenResponse { data } =
			response.json().map_err(|e| RefreshError::Parse { source: e.source })?;

		if data.access_token.is_empty() {
			return Err(RefreshError::EmptyAccessToken);
		}

		let access_token = TokenSecret::new(data.access_token);

		self.store
			.set(CredentialKey::AccessToken, access_token.clone())
			.await
			.map_err(RefreshError::Storage)?;

		if let Some(rotated) = data.refresh_token.filter(|token| !token.is_empty()) {
			self.store
				.set(CredentialKey::RefreshToken, TokenSecret::new(rotated))
				.await
				.map_err(RefreshError::Storage)?;
		}

		Ok(access_token)
	}

	/// Deletes the session, rejects every parked request, and notifies the observer once.
	async fn end_session(&self, lease: RefreshLease<'_>, error: RefreshError) -> Error {
		let error = Arc::new(error);

		// Credentials go before the lease so a new leader never reuses the dead refresh token.
		let teardown_error = self.clear_ended_session().await;
		let rejected = lease.fail(error.clone());

		self.refresh_metrics.record_failure();
		obs::note_session_expired(&*error, &self.config.redirect_target, rejected);
		self.observer.session_expired(&SessionExpired {
			message: self.config.session_expired_message.clone(),
			redirect_to: self.config.redirect_target.clone(),
			error: error.clone(),
			teardown_error,
		});

		Error::Refresh(error)
	}

	/// Deletes the credentials of an ended session.
	///
	/// When a delete fails, whatever access token is still stored gets retired so it can
	/// never start another refresh.
	async fn clear_ended_session(&self) -> Option<StoreError> {
		let e = <dyn CredentialStore>::clear(self.store.as_ref()).await.err()?;

		obs::note_teardown_failed(&e);

		if let Ok(Some(leftover)) = self.store.get(CredentialKey::AccessToken).await {
			self.coordinator.retire(&leftover);
		}

		Some(e)
	}
}
