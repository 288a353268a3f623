//! Demonstrates a booking session against a mocked backend: the expired access token is
//! refreshed once, the rejected call is replayed, and a later refresh failure ends the
//! session with a single notification to the host.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use busline_client::{
	auth::Credentials,
	client::SessionClient,
	config::ClientConfig,
	http::ReqwestTransport,
	reqwest::Client,
	session::{FnSessionObserver, SessionExpired},
	store::{CredentialStore, MemoryCredentialStore},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::default());
	let config = ClientConfig::builder(Url::parse(&server.base_url())?)
		.allow_insecure_http(true)
		.redirect_target("/login")
		.build()?;
	let observer = FnSessionObserver(|event: &SessionExpired| {
		println!("{} Redirecting to {}.", event.message, event.redirect_to);
	});
	// httpmock serves a self-signed certificate.
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = SessionClient::<ReqwestTransport>::with_transport(config, transport, store)
		.with_observer(Arc::new(observer));

	client.sign_in(Credentials::new("expired-access", "refresh-1")).await?;

	let mut expired = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/bookings")
				.header("authorization", "Bearer expired-access");
			then.status(401).body("{\"message\":\"jwt expired\"}");
		})
		.await;
	let booked = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/bookings")
				.header("authorization", "Bearer fresh-access");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"bookingId\":\"BK-1042\"}");
		})
		.await;
	let mut refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(ClientConfig::DEFAULT_REFRESH_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":{\"accessToken\":\"fresh-access\"}}");
		})
		.await;
	let booking = client.post("/api/v1/bookings", &json!({ "tripId": 7, "seat": "4B" })).await?;

	println!("Booked after a transparent refresh: {}.", booking.text());

	expired.assert_async().await;
	booked.assert_async().await;
	refresh.assert_async().await;
	expired.delete_async().await;
	refresh.delete_async().await;

	let _revoked = server
		.mock_async(|when, then| {
			when.method(POST).path(ClientConfig::DEFAULT_REFRESH_PATH);
			then.status(401).body("{\"message\":\"refresh token revoked\"}");
		})
		.await;
	let _rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/bookings");
			then.status(401);
		})
		.await;

	match client.get("/api/v1/bookings").await {
		Ok(_) => println!("Backend unexpectedly accepted the request."),
		Err(e) => println!("Request failed after the session ended: {e}."),
	}

	println!("Signed in afterwards: {}.", !client.credentials().await?.is_empty());
	println!(
		"Refresh calls: {}, failures: {}.",
		client.refresh_metrics.attempts(),
		client.refresh_metrics.failures()
	);

	Ok(())
}
