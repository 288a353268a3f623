//! Demonstrates plugging a non-reqwest HTTP stack into the session client.
//!
//! 1. Implement [`HttpTransport`] and return every HTTP response, whatever its status, as `Ok`.
//! 2. Report connection-level failures through [`TransportError`].
//! 3. Pass the transport to [`SessionClient::with_transport`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use busline_client::{
	auth::Credentials,
	client::SessionClient,
	config::ClientConfig,
	error::TransportError,
	http::{ApiRequest, ApiResponse, HeaderMap, HttpTransport, StatusCode, TransportFuture},
	store::MemoryCredentialStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::builder(Url::parse("https://api.busline.example")?).build()?;
	let client = SessionClient::<InProcessBackend>::with_transport(
		config.clone(),
		Arc::new(InProcessBackend::default()),
		Arc::new(MemoryCredentialStore::default()),
	);

	client.sign_in(Credentials::new("access-0", "refresh-0")).await?;

	let trips = client.get("/api/v1/trips?from=Hanoi&to=Hue").await?;

	println!("Trips served by the in-process backend: {}.", trips.text());
	println!("Access token was refreshed {} time(s).", client.refresh_metrics.successes());

	let offline = SessionClient::<OfflineTransport>::with_transport(
		config,
		Arc::new(OfflineTransport { host: "api.busline.example" }),
		Arc::new(MemoryCredentialStore::default()),
	);

	match offline.get("/api/v1/trips").await {
		Ok(_) => println!("Offline transport unexpectedly produced a response."),
		Err(e) => println!("Transport failure surfaced unchanged: {e}."),
	}

	Ok(())
}

/// Backend that rejects every token it did not issue itself.
#[derive(Debug, Default)]
struct InProcessBackend {
	issued: AtomicUsize,
}
impl InProcessBackend {
	fn current_token(&self) -> String {
		format!("access-{}", self.issued.load(Ordering::SeqCst))
	}

	fn respond(status: StatusCode, body: &str) -> ApiResponse {
		ApiResponse::new(status, HeaderMap::new(), body.as_bytes().to_vec())
	}
}
impl HttpTransport for InProcessBackend {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if request.url.path() == ClientConfig::DEFAULT_REFRESH_PATH {
				let issued = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

				return Ok(Self::respond(
					StatusCode::OK,
					&format!("{{\"data\":{{\"accessToken\":\"access-{issued}\"}}}}"),
				));
			}

			// Tokens issued before the first refresh are treated as expired.
			if self.issued.load(Ordering::SeqCst) == 0
				|| request.bearer_token() != Some(self.current_token().as_str())
			{
				return Ok(Self::respond(StatusCode::UNAUTHORIZED, "{\"message\":\"jwt expired\"}"));
			}

			Ok(Self::respond(StatusCode::OK, "[{\"id\":7,\"departure\":\"08:30\"}]"))
		})
	}
}

#[derive(Debug)]
struct OfflineTransport {
	host: &'static str,
}
impl HttpTransport for OfflineTransport {
	fn send(&self, _request: ApiRequest) -> TransportFuture<'_> {
		let host = self.host;

		Box::pin(async move { Err(TransportError::network(DnsFailure { host })) })
	}
}

#[derive(Debug)]
struct DnsFailure {
	host: &'static str,
}
impl Display for DnsFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "DNS lookup failed for {}", self.host)
	}
}
impl StdError for DnsFailure {}
