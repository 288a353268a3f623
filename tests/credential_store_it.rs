#![cfg(feature = "reqwest")]

// std
use std::{
	path::PathBuf,
	sync::Arc,
	time::{SystemTime, UNIX_EPOCH},
};
// crates.io
use httpmock::prelude::*;
// self
use busline_client::{
	auth::{CredentialKey, Credentials, TokenSecret},
	client::SessionClient,
	config::ClientConfig,
	http::ReqwestTransport,
	reqwest,
	store::{CredentialStore, FileCredentialStore, MemoryCredentialStore},
	url::Url,
};

fn scratch_path(name: &str) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock should be after the epoch.")
		.as_nanos();

	std::env::temp_dir()
		.join(format!("busline-client-it-{name}-{}-{nanos}", std::process::id()))
		.join("session.json")
}

/// Reqwest transport that trusts the self-signed certificate served by `httpmock`.
fn mock_transport() -> ReqwestTransport {
	ReqwestTransport::with_client(
		reqwest::Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Insecure test reqwest client should build successfully."),
	)
}

fn session_client(
	config: ClientConfig,
	store: Arc<dyn CredentialStore>,
) -> SessionClient<ReqwestTransport> {
	SessionClient::<ReqwestTransport>::with_transport(config, mock_transport(), store)
}

fn config(server: &MockServer) -> ClientConfig {
	ClientConfig::builder(
		Url::parse(&server.base_url()).expect("Mock server URL should parse successfully."),
	)
	.allow_insecure_http(true)
	.build()
	.expect("Client configuration should build successfully.")
}

#[tokio::test]
async fn rotated_credentials_survive_reopening_the_file_store() {
	let server = MockServer::start_async().await;
	let path = scratch_path("rotation");
	let store = Arc::new(FileCredentialStore::open(&path).expect("File store should open."));
	let client = session_client(config(&server), store.clone());

	client
		.sign_in(Credentials::new("access-1", "refresh-1"))
		.await
		.expect("Seeding credentials should succeed.");

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(ClientConfig::DEFAULT_REFRESH_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":{\"accessToken\":\"access-2\",\"refreshToken\":\"refresh-2\"}}");
		})
		.await;
	let token = client.refresh_now().await.expect("Forced refresh should succeed.");

	assert_eq!(token, TokenSecret::new("access-2"));

	refresh.assert_calls_async(1).await;

	let reopened = FileCredentialStore::open(&path).expect("File store should reopen.");

	assert_eq!(
		reopened.get(CredentialKey::AccessToken).await.expect("Get should succeed."),
		Some(TokenSecret::new("access-2"))
	);
	assert_eq!(
		reopened.get(CredentialKey::RefreshToken).await.expect("Get should succeed."),
		Some(TokenSecret::new("refresh-2"))
	);

	client.sign_out().await.expect("Sign-out should succeed.");

	let reopened = FileCredentialStore::open(&path).expect("File store should reopen.");

	assert!(reopened.get(CredentialKey::AccessToken).await.expect("Get should work.").is_none());
	assert!(reopened.get(CredentialKey::RefreshToken).await.expect("Get should work.").is_none());

	let _ = std::fs::remove_dir_all(path.parent().expect("Scratch path has a parent."));
}

#[tokio::test]
async fn clones_share_one_store_and_coordinator() {
	let server = MockServer::start_async().await;
	let store = Arc::new(MemoryCredentialStore::default());
	let client = session_client(config(&server), store.clone());
	let clone = client.clone();

	client
		.sign_in(Credentials::new("access-1", "refresh-1"))
		.await
		.expect("Seeding credentials should succeed.");

	assert_eq!(
		clone.credentials().await.expect("Load should succeed."),
		Credentials::new("access-1", "refresh-1")
	);

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(ClientConfig::DEFAULT_REFRESH_PATH);
			then.status(200)
				.delay(std::time::Duration::from_millis(200))
				.header("content-type", "application/json")
				.body("{\"data\":{\"accessToken\":\"access-2\"}}");
		})
		.await;
	let (first, second) = tokio::join!(client.refresh_now(), clone.refresh_now());

	assert_eq!(first.expect("Leader should refresh."), TokenSecret::new("access-2"));
	assert_eq!(second.expect("Follower should share the result."), TokenSecret::new("access-2"));

	refresh.assert_calls_async(1).await;

	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(clone.refresh_metrics.parked(), 1);
	assert_eq!(store.peek(CredentialKey::RefreshToken), Some(TokenSecret::new("refresh-1")));
}
