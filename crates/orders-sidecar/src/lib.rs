//! Client for the sidecar runtime's HTTP API.
//!
//! The façades never talk to a database or broker directly. State and
//! publish operations are forwarded to the sidecar process running next to
//! the service, which owns the configured state store and pub/sub
//! components. This crate wraps the handful of sidecar endpoints the
//! façades need:
//!
//! - `POST   /v1.0/state/{store}` save a batch of key/value pairs
//! - `GET    /v1.0/state/{store}/{key}` read one key (204 when absent)
//! - `DELETE /v1.0/state/{store}/{key}` delete one key
//! - `POST   /v1.0/publish/{pubsub}/{topic}` publish one event
//! - `GET    /v1.0/healthz/outbound` readiness of the sidecar's client APIs
//! - `POST   /{method}` with `dapr-app-id` invoke a method on another app
//!
//! A single `DaprClient` is built at startup and shared by every request;
//! the underlying `reqwest::Client` pools connections and is safe for
//! concurrent use.

use orders_types::{ConfigSchema, Field, FieldType, Schema, SecretString, ValidationError};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Header carrying the sidecar API token.
pub const API_TOKEN_HEADER: &str = "dapr-api-token";
/// Header naming the target application of a service invocation.
pub const APP_ID_HEADER: &str = "dapr-app-id";
/// Sidecar HTTP endpoint used when none is configured.
pub const DEFAULT_HTTP_ENDPOINT: &str = "http://127.0.0.1:3500";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_WAIT_TIMEOUT_SECONDS: u64 = 5;
const API_VERSION: &str = "v1.0";

/// Errors that can occur when calling the sidecar.
#[derive(Debug, Error)]
pub enum SidecarError {
	/// Transport failure: connection refused, timeout, malformed response.
	#[error("Sidecar request failed: {0}")]
	Http(String),
	/// The sidecar answered with a non-success status.
	#[error("Sidecar returned {status}: {body}")]
	Status {
		/// HTTP status code returned by the sidecar.
		status: u16,
		/// Response body, usually the sidecar's error document.
		body: String,
	},
	/// The endpoint or an implementation table was rejected.
	#[error("Sidecar configuration error: {0}")]
	Configuration(String),
	/// The sidecar did not become ready in time.
	#[error("Sidecar unavailable: {0}")]
	Unavailable(String),
}

impl From<reqwest::Error> for SidecarError {
	fn from(err: reqwest::Error) -> Self {
		SidecarError::Http(err.to_string())
	}
}

/// Connection settings for the sidecar, read from an implementation table.
#[derive(Debug, Clone)]
pub struct DaprConfig {
	pub http_endpoint: String,
	/// Sent as `dapr-api-token` when set and non-empty.
	pub api_token: Option<SecretString>,
	/// Per-request transport timeout.
	pub timeout: Duration,
	/// How long startup waits for the sidecar; zero skips the wait.
	pub wait_timeout: Duration,
}

impl Default for DaprConfig {
	fn default() -> Self {
		Self {
			http_endpoint: DEFAULT_HTTP_ENDPOINT.to_string(),
			api_token: None,
			timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
			wait_timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECONDS),
		}
	}
}

impl DaprConfig {
	/// Parses and validates an implementation table.
	///
	/// Configuration parameters:
	/// - `http_endpoint`: sidecar base URL (default: "http://127.0.0.1:3500")
	/// - `api_token`: optional API token; an empty string means none
	/// - `timeout_seconds`: per-request timeout (default: 30)
	/// - `wait_timeout_seconds`: startup readiness wait (default: 5, 0 disables)
	pub fn from_toml(config: &toml::Value) -> Result<Self, SidecarError> {
		DaprSchema
			.validate(config)
			.map_err(|e| SidecarError::Configuration(e.to_string()))?;

		let defaults = Self::default();
		let http_endpoint = config
			.get("http_endpoint")
			.and_then(|v| v.as_str())
			.map(|s| s.trim_end_matches('/').to_string())
			.unwrap_or(defaults.http_endpoint);
		let api_token = config
			.get("api_token")
			.and_then(|v| v.as_str())
			.filter(|s| !s.is_empty())
			.map(SecretString::from);
		let timeout = config
			.get("timeout_seconds")
			.and_then(|v| v.as_integer())
			.map(|v| Duration::from_secs(v as u64))
			.unwrap_or(defaults.timeout);
		let wait_timeout = config
			.get("wait_timeout_seconds")
			.and_then(|v| v.as_integer())
			.map(|v| Duration::from_secs(v as u64))
			.unwrap_or(defaults.wait_timeout);

		Ok(Self {
			http_endpoint,
			api_token,
			timeout,
			wait_timeout,
		})
	}
}

/// Configuration schema shared by every sidecar-backed implementation.
pub struct DaprSchema;

impl ConfigSchema for DaprSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("http_endpoint", FieldType::String).with_validator(|value| {
					let endpoint = value.as_str().unwrap_or_default();
					match Url::parse(endpoint) {
						Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
						Ok(url) => Err(format!("unsupported scheme '{}'", url.scheme())),
						Err(e) => Err(format!("invalid URL '{}': {}", endpoint, e)),
					}
				}),
				Field::new("api_token", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(3600),
					},
				),
				Field::new(
					"wait_timeout_seconds",
					FieldType::Integer {
						min: Some(0),
						max: Some(3600),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// HTTP client for one sidecar.
pub struct DaprClient {
	http: reqwest::Client,
	endpoint: Url,
	api_token: Option<SecretString>,
	wait_timeout: Duration,
}

impl DaprClient {
	/// Creates a client for the sidecar at `config.http_endpoint`.
	///
	/// # Arguments
	///
	/// * `config` - Endpoint, optional API token and timeouts
	///
	/// # Errors
	///
	/// Returns [`SidecarError::Configuration`] when the endpoint is not an
	/// absolute URL usable as a base.
	pub fn new(config: DaprConfig) -> Result<Self, SidecarError> {
		let endpoint = Url::parse(&config.http_endpoint).map_err(|e| {
			SidecarError::Configuration(format!(
				"Invalid sidecar endpoint '{}': {}",
				config.http_endpoint, e
			))
		})?;
		if endpoint.cannot_be_a_base() {
			return Err(SidecarError::Configuration(format!(
				"Sidecar endpoint cannot be used as a base URL: {}",
				endpoint
			)));
		}

		let http = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(config.timeout)
			.build()?;

		Ok(Self {
			http,
			endpoint,
			api_token: config.api_token,
			wait_timeout: config.wait_timeout,
		})
	}

	/// Builds a client from a raw implementation table.
	pub fn from_toml(config: &toml::Value) -> Result<Self, SidecarError> {
		Self::new(DaprConfig::from_toml(config)?)
	}

	/// Base URL every request is built from.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Startup readiness wait configured for this client.
	pub fn wait_timeout(&self) -> Duration {
		self.wait_timeout
	}

	/// Builds `{endpoint}/v1.0/{segments...}`, percent-encoding each segment.
	fn url(&self, segments: &[&str]) -> Url {
		self.join(std::iter::once(API_VERSION).chain(segments.iter().copied()))
	}

	/// Appends `segments` to the endpoint path, percent-encoding each one.
	fn join<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
		let mut url = self.endpoint.clone();
		// `new` rejects cannot-be-a-base endpoints, so segments are always available.
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty();
			path.extend(segments);
		}
		url
	}

	fn request(&self, method: Method, url: Url) -> RequestBuilder {
		let builder = self.http.request(method, url);
		match &self.api_token {
			Some(token) => builder.header(API_TOKEN_HEADER, token.expose_secret()),
			None => builder,
		}
	}

	/// Saves one key. `value` is stored as a JSON document when it parses
	/// as JSON, otherwise as a JSON string.
	///
	/// # Arguments
	///
	/// * `store` - Name of the sidecar's state store component
	/// * `key` - State key
	/// * `value` - Encoded value
	pub async fn save_state(&self, store: &str, key: &str, value: &[u8]) -> Result<(), SidecarError> {
		let value = serde_json::from_slice::<serde_json::Value>(value)
			.unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(value).into_owned()));
		let body = serde_json::json!([{ "key": key, "value": value }]);

		tracing::debug!(store = %store, key = %key, "Saving state");
		let response = self
			.request(Method::POST, self.url(&["state", store]))
			.json(&body)
			.send()
			.await?;
		check_status(response).await.map(|_| ())
	}

	/// Reads one key; `None` when the store has no value for it.
	pub async fn get_state(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>, SidecarError> {
		tracing::debug!(store = %store, key = %key, "Reading state");
		let response = self
			.request(Method::GET, self.url(&["state", store, key]))
			.send()
			.await?;
		let response = check_status(response).await?;
		if response.status() == StatusCode::NO_CONTENT {
			return Ok(None);
		}

		let bytes = response.bytes().await?;
		if bytes.is_empty() {
			Ok(None)
		} else {
			Ok(Some(bytes.to_vec()))
		}
	}

	/// Deletes one key.
	///
	/// The sidecar acknowledges deletes of absent keys, so only transport
	/// and component failures are reported.
	pub async fn delete_state(&self, store: &str, key: &str) -> Result<(), SidecarError> {
		tracing::debug!(store = %store, key = %key, "Deleting state");
		let response = self
			.request(Method::DELETE, self.url(&["state", store, key]))
			.send()
			.await?;
		check_status(response).await.map(|_| ())
	}

	/// Publishes `payload` as a JSON event on `pubsub`/`topic`.
	pub async fn publish_event(&self, pubsub: &str, topic: &str, payload: &[u8]) -> Result<(), SidecarError> {
		tracing::debug!(pubsub = %pubsub, topic = %topic, "Publishing event");
		let response = self
			.request(Method::POST, self.url(&["publish", pubsub, topic]))
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.body(payload.to_vec())
			.send()
			.await?;
		check_status(response).await.map(|_| ())
	}

	/// Invokes `method` on the application registered as `app_id`.
	///
	/// The request is POSTed to `{endpoint}/{method}` with the target named
	/// in the `dapr-app-id` header; the sidecar routes it to that app. Returns
	/// the app's response body.
	///
	/// # Arguments
	///
	/// * `app_id` - Id of the target application
	/// * `method` - Route on the target, e.g. `neworder`
	/// * `payload` - JSON request body
	pub async fn invoke_method(&self, app_id: &str, method: &str, payload: &[u8]) -> Result<Vec<u8>, SidecarError> {
		tracing::debug!(app_id = %app_id, method = %method, "Invoking method");
		let url = self.join(method.split('/').filter(|segment| !segment.is_empty()));
		let response = self
			.request(Method::POST, url)
			.header(APP_ID_HEADER, app_id)
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.body(payload.to_vec())
			.send()
			.await?;
		let response = check_status(response).await?;
		Ok(response.bytes().await?.to_vec())
	}

	/// Checks that the sidecar's client-facing APIs are ready.
	pub async fn healthz(&self) -> Result<(), SidecarError> {
		let response = self
			.request(Method::GET, self.url(&["healthz", "outbound"]))
			.send()
			.await?;
		check_status(response).await.map(|_| ())
	}

	/// Polls the health endpoint until it succeeds or `timeout` elapses.
	///
	/// Each health check is cut off at the deadline, so a sidecar that accepts
	/// connections but never answers cannot hold the caller past `timeout`.
	/// A zero timeout returns immediately without probing.
	pub async fn wait_for_sidecar(&self, timeout: Duration) -> Result<(), SidecarError> {
		if timeout.is_zero() {
			return Ok(());
		}

		let deadline = Instant::now() + timeout;
		loop {
			let remaining = deadline.saturating_duration_since(Instant::now());
			let error = match tokio::time::timeout(remaining, self.healthz()).await {
				Ok(Ok(())) => {
					tracing::info!(endpoint = %self.endpoint, "Sidecar is ready");
					return Ok(());
				},
				Ok(Err(e)) => e,
				Err(_) => SidecarError::Http(format!("health check timed out after {:?}", remaining)),
			};

			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				return Err(SidecarError::Unavailable(format!(
					"{} not ready after {:?}: {}",
					self.endpoint, timeout, error
				)));
			}
			tracing::debug!(error = %error, "Waiting for sidecar");
			tokio::time::sleep(remaining.min(Duration::from_millis(250))).await;
		}
	}
}

/// Turns a non-success status into `SidecarError::Status`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SidecarError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.text().await.unwrap_or_default();
	Err(SidecarError::Status {
		status: status.as_u16(),
		body,
	})
}
