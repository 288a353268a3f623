//! JSON file [`CredentialStore`] so native hosts keep the session across restarts.

// std
use std::{
	collections::BTreeMap,
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
	store::{CredentialStore, StoreError, StoreFuture},
};

type Snapshot = BTreeMap<CredentialKey, TokenSecret>;

/// Persists credentials to a JSON object keyed by cookie name after each mutation.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileCredentialStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::new()),
			Err(e) => return Err(backend("read", path, e)),
		};

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Snapshot::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			Some(parent) => fs::create_dir_all(parent).map_err(|e| backend("create", parent, e)),
			None => Ok(()),
		}
	}

	/// Writes the snapshot to a sibling temp file, then renames it over the store file.
	fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		let serialized = serde_json::to_vec_pretty(snapshot).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize credentials: {e}") }
		})?;
		let tmp_path = self.path.with_extension("tmp");

		Self::ensure_parent_exists(&self.path)?;

		let mut file = File::create(&tmp_path).map_err(|e| backend("create", &tmp_path, e))?;

		file.write_all(&serialized).map_err(|e| backend("write", &tmp_path, e))?;
		file.sync_all().map_err(|e| backend("sync", &tmp_path, e))?;
		drop(file);

		fs::rename(&tmp_path, &self.path).map_err(|e| backend("replace", &self.path, e))
	}

	/// Applies `apply` and persists the result; memory only changes once the file did.
	fn mutate(&self, apply: impl FnOnce(&mut Snapshot) -> bool) -> Result<(), StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		if apply(&mut next) {
			self.persist(&next)?;

			*guard = next;
		}

		Ok(())
	}
}
impl CredentialStore for FileCredentialStore {
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.inner.read().get(&key).cloned()) })
	}

	fn set(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.mutate(|snapshot| snapshot.insert(key, value.clone()).as_ref() != Some(&value))
		})
	}

	fn delete(&self, key: CredentialKey) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|snapshot| snapshot.remove(&key).is_some()) })
	}
}

fn backend(action: &str, path: &Path, e: std::io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}

#[cfg(test)]
mod tests {
	// std
	use std::time::{SystemTime, UNIX_EPOCH};
	// self
	use super::*;

	fn scratch_path(name: &str) -> PathBuf {
		let nanos = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.expect("System clock should be after the epoch.")
			.as_nanos();

		std::env::temp_dir()
			.join(format!("busline-client-{name}-{}-{nanos}", std::process::id()))
			.join("session.json")
	}

	#[tokio::test]
	async fn persists_across_reopen() {
		let path = scratch_path("reopen");
		let store = FileCredentialStore::open(&path).expect("Store should open.");

		store
			.set(CredentialKey::AccessToken, TokenSecret::new("access-file"))
			.await
			.expect("Set should succeed.");
		store
			.set(CredentialKey::RefreshToken, TokenSecret::new("refresh-file"))
			.await
			.expect("Set should succeed.");

		let contents = fs::read_to_string(&path).expect("Store file should exist.");

		assert!(contents.contains("\"accessToken\""));
		assert!(contents.contains("\"refreshToken\""));

		let reopened = FileCredentialStore::open(&path).expect("Store should reopen.");

		assert_eq!(
			reopened.get(CredentialKey::AccessToken).await.expect("Get should succeed."),
			Some(TokenSecret::new("access-file"))
		);

		reopened.delete(CredentialKey::AccessToken).await.expect("Delete should succeed.");

		let again = FileCredentialStore::open(&path).expect("Store should reopen.");

		assert!(
			again.get(CredentialKey::AccessToken).await.expect("Get should succeed.").is_none()
		);
		assert_eq!(
			again.get(CredentialKey::RefreshToken).await.expect("Get should succeed."),
			Some(TokenSecret::new("refresh-file"))
		);

		let _ = fs::remove_dir_all(path.parent().expect("Scratch path has a parent."));
	}

	#[test]
	fn corrupt_file_is_a_serialization_error() {
		let path = scratch_path("corrupt");

		FileCredentialStore::ensure_parent_exists(&path).expect("Parent should be created.");
		fs::write(&path, b"{not json").expect("Fixture should be written.");

		let err = FileCredentialStore::open(&path).expect_err("Corrupt store should fail to open.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		let _ = fs::remove_dir_all(path.parent().expect("Scratch path has a parent."));
	}
}
