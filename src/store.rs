//! Storage contracts and built-in stores for session credentials.
//!
//! The browser keeps `accessToken` and `refreshToken` in cookies; here any key/value backend
//! that can get, set, and delete by [`CredentialKey`] plays that role.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, Credentials, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key/value backend holding the session credentials.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the credential stored under `key`.
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Writes (or replaces) the credential stored under `key`.
	fn set(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()>;

	/// Removes the credential stored under `key`; removing a missing key is not an error.
	fn delete(&self, key: CredentialKey) -> StoreFuture<'_, ()>;
}
impl<'s> dyn CredentialStore + 's {
	/// Reads both credentials into a snapshot.
	pub async fn load(&self) -> Result<Credentials, StoreError> {
		Ok(Credentials {
			access_token: self.get(CredentialKey::AccessToken).await?,
			refresh_token: self.get(CredentialKey::RefreshToken).await?,
		})
	}

	/// Writes every credential present in the snapshot; absent ones are deleted.
	pub async fn save(&self, credentials: Credentials) -> Result<(), StoreError> {
		let Credentials { access_token, refresh_token } = credentials;

		for (key, value) in [
			(CredentialKey::AccessToken, access_token),
			(CredentialKey::RefreshToken, refresh_token),
		] {
			match value {
				Some(secret) => self.set(key, secret).await?,
				None => self.delete(key).await?,
			}
		}

		Ok(())
	}

	/// Deletes both credentials.
	///
	/// Every key is attempted even when an earlier delete fails; the first failure is
	/// returned afterwards. The refresh token is deleted first.
	pub async fn clear(&self) -> Result<(), StoreError> {
		let mut first_error = None;

		for key in [CredentialKey::RefreshToken, CredentialKey::AccessToken] {
			if let Err(e) = self.delete(key).await {
				first_error.get_or_insert(e);
			}
		}

		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
