//! Configuration for the order façade services.
//!
//! Configuration is read from TOML. Before parsing, `${VAR}` and
//! `${VAR:-default}` references are replaced with environment values, so
//! the usual sidecar variables (`DAPR_HTTP_ENDPOINT`, `DAPR_API_TOKEN`,
//! `KVSTORE_NAME`, `PUBSUB_NAME`) can drive a checked-in file.
//!
//! ## Modular Configuration Support
//!
//! A file may pull in others with `include = ["state.toml", "pubsub.toml"]`.
//! Paths are relative to the including file and each top-level section may
//! only be defined once across all files.

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The full error embeds the whole input; keep only the message.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration shared by all façades.
///
/// Each façade only reads the sections it needs: the state façade requires
/// `[state]`, the publish façade requires `[pubsub]`, the invocation client
/// requires `[invocation]`, and the subscriber and invocation server read
/// their route from `[pubsub]` and `[invocation]` when present.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// State store capability used by the state façade.
	pub state: Option<StateConfig>,
	/// Pub/sub capability used by the publish and subscribe façades.
	pub pubsub: Option<PubSubConfig>,
	/// Service invocation between the invocation client and server.
	pub invocation: Option<InvocationConfig>,
	/// Listener settings of each façade.
	#[serde(default)]
	pub api: ApiConfig,
}

/// Configuration of the state store capability.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateConfig {
	/// Logical name of the sidecar's state store component.
	#[serde(default = "default_store_name")]
	pub store_name: String,
	/// Which implementation to use.
	pub primary: String,
	/// Map of implementation names to their raw configuration tables.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration of the pub/sub capability.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PubSubConfig {
	/// Logical name of the sidecar's pub/sub component.
	#[serde(default = "default_pubsub_name")]
	pub pubsub_name: String,
	/// Topic orders are published to and consumed from.
	#[serde(default = "default_topic")]
	pub topic: String,
	/// Route the sidecar delivers subscribed events to.
	#[serde(default = "default_subscribe_route")]
	pub subscribe_route: String,
	/// Which implementation to use.
	pub primary: String,
	/// Map of implementation names to their raw configuration tables.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration of service invocation.
///
/// The invocation client forwards each order through its sidecar to the
/// application `app_id`, calling `method`; the invocation server serves
/// that method as a route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvocationConfig {
	/// Id of the application orders are sent to.
	#[serde(default = "default_invoke_app_id")]
	pub app_id: String,
	/// Method invoked on the target, without the leading `/`.
	#[serde(default = "default_invoke_method")]
	pub method: String,
	/// Sidecar connection table, same keys as a `dapr` implementation table.
	#[serde(default = "empty_table")]
	pub sidecar: toml::Value,
}

impl InvocationConfig {
	/// Route the invocation server registers for `method`.
	pub fn route(&self) -> String {
		format!("/{}", self.method.trim_start_matches('/'))
	}
}

/// Listener settings for each façade.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub state: ServerConfig,
	#[serde(default)]
	pub publish: ServerConfig,
	#[serde(default)]
	pub subscribe: ServerConfig,
	#[serde(default)]
	pub invoke_client: ServerConfig,
	#[serde(default)]
	pub invoke_server: ServerConfig,
}

impl ApiConfig {
	pub const DEFAULT_STATE_PORT: u16 = 8080;
	pub const DEFAULT_PUBLISH_PORT: u16 = 5001;
	pub const DEFAULT_SUBSCRIBE_PORT: u16 = 5002;
	pub const DEFAULT_INVOKE_CLIENT_PORT: u16 = 6001;
	pub const DEFAULT_INVOKE_SERVER_PORT: u16 = 6002;
}

/// Listener settings for one façade.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
	/// Host address to bind to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind to; each façade has its own default.
	pub port: Option<u16>,
	/// Maximum accepted request body in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: default_api_host(),
			port: None,
			max_request_size: default_max_request_size(),
		}
	}
}

impl ServerConfig {
	/// Returns `host:port`, falling back to the façade's default port.
	pub fn bind_address(&self, default_port: u16) -> String {
		format!("{}:{}", self.host, self.port.unwrap_or(default_port))
	}
}

/// State store component name used when `store_name` is not set.
pub const DEFAULT_STORE_NAME: &str = "statestore";
/// Pub/sub component name used when `pubsub_name` is not set.
pub const DEFAULT_PUBSUB_NAME: &str = "pubsub";
pub const DEFAULT_TOPIC: &str = "orders";
pub const DEFAULT_SUBSCRIBE_ROUTE: &str = "/neworder";
/// Application id the invocation client targets when `app_id` is not set.
pub const DEFAULT_INVOKE_APP_ID: &str = "order-processor";
pub const DEFAULT_INVOKE_METHOD: &str = "neworder";

fn default_store_name() -> String {
	DEFAULT_STORE_NAME.to_string()
}

fn default_pubsub_name() -> String {
	DEFAULT_PUBSUB_NAME.to_string()
}

fn default_topic() -> String {
	DEFAULT_TOPIC.to_string()
}

fn default_subscribe_route() -> String {
	DEFAULT_SUBSCRIBE_ROUTE.to_string()
}

fn default_invoke_app_id() -> String {
	DEFAULT_INVOKE_APP_ID.to_string()
}

fn default_invoke_method() -> String {
	DEFAULT_INVOKE_METHOD.to_string()
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}

fn default_api_host() -> String {
	"localhost".to_string()
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Replaces `${VAR}` and `${VAR:-default}` with environment values.
///
/// A referenced variable that is unset and has no default is an error.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut output = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		output.push_str(&input[last..whole.start()]);
		output.push_str(&value);
		last = whole.end();
	}
	output.push_str(&input[last..]);

	Ok(output)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;

		loader::ConfigLoader::new(base_dir).load_config(file_name).await
	}

	/// Deserializes and validates an already env-resolved TOML document.
	pub(crate) fn from_toml(value: toml::Value) -> Result<Self, ConfigError> {
		let config: Config = value.try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Checks the cross-field rules serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if let Some(state) = &self.state {
			if state.store_name.trim().is_empty() {
				return Err(ConfigError::Validation(
					"State store_name cannot be empty".into(),
				));
			}
			validate_primary("state", &state.primary, &state.implementations)?;
		}

		if let Some(pubsub) = &self.pubsub {
			if pubsub.pubsub_name.trim().is_empty() {
				return Err(ConfigError::Validation(
					"Pub/sub pubsub_name cannot be empty".into(),
				));
			}
			if pubsub.topic.trim().is_empty() {
				return Err(ConfigError::Validation(
					"Pub/sub topic cannot be empty".into(),
				));
			}
			if !pubsub.subscribe_route.starts_with('/') {
				return Err(ConfigError::Validation(format!(
					"Pub/sub subscribe_route must start with '/': {}",
					pubsub.subscribe_route
				)));
			}
			// The route is registered literally, so it must not contain path captures.
			if pubsub.subscribe_route.contains(['{', '}', '*']) {
				return Err(ConfigError::Validation(format!(
					"Pub/sub subscribe_route must be a literal path: {}",
					pubsub.subscribe_route
				)));
			}
			validate_primary("pubsub", &pubsub.primary, &pubsub.implementations)?;
		}

		if let Some(invocation) = &self.invocation {
			if invocation.app_id.trim().is_empty() {
				return Err(ConfigError::Validation(
					"Invocation app_id cannot be empty".into(),
				));
			}
			if invocation.method.trim_start_matches('/').trim().is_empty() {
				return Err(ConfigError::Validation(
					"Invocation method cannot be empty".into(),
				));
			}
			if invocation.method.contains(['{', '}', '*']) {
				return Err(ConfigError::Validation(format!(
					"Invocation method must be a literal path: {}",
					invocation.method
				)));
			}
			if !invocation.sidecar.is_table() {
				return Err(ConfigError::Validation(
					"Invocation sidecar must be a table".into(),
				));
			}
		}

		for (name, server) in [
			("state", &self.api.state),
			("publish", &self.api.publish),
			("subscribe", &self.api.subscribe),
			("invoke_client", &self.api.invoke_client),
			("invoke_server", &self.api.invoke_server),
		] {
			if server.port == Some(0) {
				return Err(ConfigError::Validation(format!(
					"api.{}.port must be greater than 0",
					name
				)));
			}
			if server.max_request_size == 0 {
				return Err(ConfigError::Validation(format!(
					"api.{}.max_request_size must be greater than 0",
					name
				)));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses configuration from a TOML string, resolving environment
/// variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let value: toml::Value = toml::from_str(&resolved)?;
		Self::from_toml(value)
	}
}
