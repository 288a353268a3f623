//! Best-effort inspection of JWT access tokens.
//!
//! Access tokens are opaque to the client. When one happens to be a JWT, its `exp` claim
//! lets the client refresh ahead of expiry instead of waiting for a `401`. Nothing here
//! verifies signatures; the backend stays the authority on validity.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::TokenSecret};

#[derive(Deserialize)]
struct RegisteredClaims {
	exp: Option<i64>,
}

/// Returns the `exp` instant of a JWT access token, or `None` for opaque tokens.
pub fn access_token_expiry(token: &TokenSecret) -> Option<OffsetDateTime> {
	let mut segments = token.expose().split('.');
	let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

	if segments.next().is_some() {
		return None;
	}

	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	let claims = serde_json::from_slice::<RegisteredClaims>(&bytes).ok()?;

	OffsetDateTime::from_unix_timestamp(claims.exp?).ok()
}

/// Returns `true` when the token is a JWT whose expiry falls within `window` of `now`.
pub fn expires_within(token: &TokenSecret, now: OffsetDateTime, window: Duration) -> bool {
	match access_token_expiry(token) {
		Some(expires_at) => expires_at - now <= window,
		None => false,
	}
}
