//! Storage names and snapshots for the two session credentials.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Names under which the session credentials live in the credential store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialKey {
	/// Short-lived bearer credential attached to every request.
	#[serde(rename = "accessToken")]
	AccessToken,
	/// Longer-lived credential exchanged for new access tokens.
	#[serde(rename = "refreshToken")]
	RefreshToken,
}
impl CredentialKey {
	/// Both keys, in the order they are written and deleted.
	pub const ALL: [Self; 2] = [Self::AccessToken, Self::RefreshToken];

	/// Returns the storage name (cookie name) for the key.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AccessToken => "accessToken",
			Self::RefreshToken => "refreshToken",
		}
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Point-in-time view of the stored session credentials.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
	/// Current access token, if any.
	pub access_token: Option<TokenSecret>,
	/// Current refresh token, if any.
	pub refresh_token: Option<TokenSecret>,
}
impl Credentials {
	/// Builds a full credential pair, typically right after login.
	pub fn new(
		access_token: impl Into<TokenSecret>,
		refresh_token: impl Into<TokenSecret>,
	) -> Self {
		Self { access_token: Some(access_token.into()), refresh_token: Some(refresh_token.into()) }
	}

	/// Returns `true` when neither credential is present, meaning nobody is signed in.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none()
	}

	/// Returns the credential stored under `key`.
	pub fn get(&self, key: CredentialKey) -> Option<&TokenSecret> {
		match key {
			CredentialKey::AccessToken => self.access_token.as_ref(),
			CredentialKey::RefreshToken => self.refresh_token.as_ref(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn keys_use_cookie_names() {
		assert_eq!(CredentialKey::AccessToken.as_str(), "accessToken");
		assert_eq!(CredentialKey::RefreshToken.to_string(), "refreshToken");
		assert_eq!(
			serde_json::to_string(&CredentialKey::RefreshToken)
				.expect("Credential key should serialize."),
			"\"refreshToken\""
		);
	}

	#[test]
	fn emptiness_requires_both_tokens_missing() {
		let only_refresh =
			Credentials { access_token: None, refresh_token: Some(TokenSecret::new("r")) };

		assert!(Credentials::default().is_empty());
		assert!(!only_refresh.is_empty());
		assert!(!Credentials::new("a", "r").is_empty());
		assert_eq!(
			only_refresh.get(CredentialKey::RefreshToken).map(TokenSecret::expose),
			Some("r")
		);
		assert!(only_refresh.get(CredentialKey::AccessToken).is_none());
	}
}
