//! Construction of the façade services from configuration.
//!
//! Every configured implementation is created through its factory so that a
//! broken table is reported at startup even when it is not the primary. The
//! primary is then wrapped in its service and given the chance to wait for
//! its backend before the listener opens.

use crate::apis::invoke::Invoker;
use orders_config::Config;
use orders_pubsub::{PubSubError, PublishService, PublisherInterface};
use orders_sidecar::DaprClient;
use orders_state::{StateError, StateService, StateStoreInterface};
use orders_types::Subscription;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while building a façade.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builds the façade services from a loaded configuration.
pub struct OrdersBuilder {
	config: Config,
}

impl OrdersBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the state service from the `[state]` section.
	pub async fn build_state<F>(&self, factories: &HashMap<String, F>) -> Result<StateService, BuilderError>
	where
		F: Fn(&toml::Value) -> Result<Box<dyn StateStoreInterface>, StateError>,
	{
		let state = self
			.config
			.state
			.as_ref()
			.ok_or_else(|| BuilderError::MissingComponent("state".into()))?;

		let mut implementations = HashMap::new();
		for (name, config) in &state.implementations {
			let Some(factory) = factories.get(name) else {
				tracing::warn!(component = "state", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &state.primary == name;
					tracing::info!(component = "state", implementation = %name, enabled = %is_primary, "Loaded");
					implementations.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "state",
						implementation = %name,
						error = %e,
						"Failed to create state store implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create state store implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let backend = implementations.remove(&state.primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary state store '{}' failed to load or has no registered factory",
				state.primary
			))
		})?;

		let service = StateService::new(backend, state.store_name.clone());
		service.wait_ready().await.map_err(|e| {
			BuilderError::Config(format!("State store '{}' is not ready: {}", state.primary, e))
		})?;

		tracing::info!(component = "state", store = %service.store_name(), "State service ready");
		Ok(service)
	}

	/// Builds the publish service from the `[pubsub]` section.
	pub async fn build_publisher<F>(&self, factories: &HashMap<String, F>) -> Result<PublishService, BuilderError>
	where
		F: Fn(&toml::Value) -> Result<Box<dyn PublisherInterface>, PubSubError>,
	{
		let pubsub = self
			.config
			.pubsub
			.as_ref()
			.ok_or_else(|| BuilderError::MissingComponent("pubsub".into()))?;

		let mut implementations = HashMap::new();
		for (name, config) in &pubsub.implementations {
			let Some(factory) = factories.get(name) else {
				tracing::warn!(component = "pubsub", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &pubsub.primary == name;
					tracing::info!(component = "pubsub", implementation = %name, enabled = %is_primary, "Loaded");
					implementations.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "pubsub",
						implementation = %name,
						error = %e,
						"Failed to create publisher implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create publisher implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let backend = implementations.remove(&pubsub.primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary publisher '{}' failed to load or has no registered factory",
				pubsub.primary
			))
		})?;

		let service = PublishService::new(backend, pubsub.pubsub_name.clone(), pubsub.topic.clone());
		service.wait_ready().await.map_err(|e| {
			BuilderError::Config(format!("Publisher '{}' is not ready: {}", pubsub.primary, e))
		})?;

		tracing::info!(
			component = "pubsub",
			pubsub = %service.pubsub_name(),
			topic = %service.topic(),
			"Publish service ready"
		);
		Ok(service)
	}

	/// Builds the invoker from the `[invocation]` section and waits for its
	/// sidecar.
	pub async fn build_invoker(&self) -> Result<Invoker, BuilderError> {
		let invocation = self
			.config
			.invocation
			.as_ref()
			.ok_or_else(|| BuilderError::MissingComponent("invocation".into()))?;

		let client = DaprClient::from_toml(&invocation.sidecar).map_err(|e| {
			tracing::error!(component = "invocation", error = %e, "Failed to create sidecar client");
			BuilderError::Config(format!("Failed to create invocation sidecar client: {}", e))
		})?;

		let invoker = Invoker::new(client, invocation.app_id.clone(), invocation.method.clone());
		invoker
			.wait_ready()
			.await
			.map_err(|e| BuilderError::Config(format!("Invocation sidecar is not ready: {}", e)))?;

		tracing::info!(
			component = "invocation",
			app_id = %invocation.app_id,
			method = %invocation.method,
			"Invoker ready"
		);
		Ok(invoker)
	}

	/// Route served by the invocation server.
	pub fn invoke_route(&self) -> String {
		match &self.config.invocation {
			Some(invocation) => invocation.route(),
			None => format!("/{}", orders_config::DEFAULT_INVOKE_METHOD),
		}
	}

	/// Subscription advertised by the subscriber.
	///
	/// The subscriber needs no backend; without a `[pubsub]` section it
	/// falls back to the default component, topic and route.
	pub fn subscription(&self) -> Subscription {
		match &self.config.pubsub {
			Some(pubsub) => Subscription {
				pubsubname: pubsub.pubsub_name.clone(),
				topic: pubsub.topic.clone(),
				route: pubsub.subscribe_route.clone(),
			},
			None => Subscription {
				pubsubname: orders_config::DEFAULT_PUBSUB_NAME.to_string(),
				topic: orders_config::DEFAULT_TOPIC.to_string(),
				route: orders_config::DEFAULT_SUBSCRIBE_ROUTE.to_string(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orders_state::implementations::memory::create_state_store as create_memory_store;
	use orders_types::Order;

	type StateFactory = fn(&toml::Value) -> Result<Box<dyn StateStoreInterface>, StateError>;
	type PublisherFactory = fn(&toml::Value) -> Result<Box<dyn PublisherInterface>, PubSubError>;

	fn state_factories() -> HashMap<String, StateFactory> {
		orders_state::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect()
	}

	fn publisher_factories() -> HashMap<String, PublisherFactory> {
		orders_pubsub::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect()
	}

	fn config(src: &str) -> Config {
		src.parse().unwrap()
	}

	#[tokio::test]
	async fn test_build_state_with_memory_primary() {
		let builder = OrdersBuilder::new(config(
			r#"
[state]
store_name = "kvstore"
primary = "memory"
[state.implementations.memory]
"#,
		));

		let service = builder.build_state(&state_factories()).await.unwrap();
		assert_eq!(service.store_name(), "kvstore");

		service
			.save_bytes("1", Order::new(1).to_json().unwrap())
			.await
			.unwrap();
		assert_eq!(service.get_bytes("1").await.unwrap(), br#"{"orderId":1}"#.to_vec());
	}

	#[tokio::test]
	async fn test_build_state_missing_section() {
		let builder = OrdersBuilder::new(config("[api.state]\nport = 8081\n"));
		let err = builder.build_state(&state_factories()).await.err().unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(ref c) if c == "state"));
	}

	#[tokio::test]
	async fn test_build_state_invalid_secondary_fails() {
		let builder = OrdersBuilder::new(config(
			r#"
[state]
primary = "memory"
[state.implementations.memory]
[state.implementations.file]
storage_path = 42
"#,
		));

		let err = builder.build_state(&state_factories()).await.err().unwrap();
		assert!(err.to_string().contains("'file'"));
	}

	#[tokio::test]
	async fn test_build_state_primary_without_factory() {
		let builder = OrdersBuilder::new(config(
			r#"
[state]
primary = "memory"
[state.implementations.memory]
"#,
		));

		let mut factories: HashMap<String, StateFactory> = HashMap::new();
		factories.insert("other".into(), create_memory_store);

		let err = builder.build_state(&factories).await.err().unwrap();
		assert!(err.to_string().contains("Primary state store 'memory'"));
	}

	#[tokio::test]
	async fn test_build_state_unready_sidecar_fails() {
		let builder = OrdersBuilder::new(config(
			r#"
[state]
primary = "dapr"
[state.implementations.dapr]
http_endpoint = "http://127.0.0.1:1"
wait_timeout_seconds = 1
"#,
		));

		let err = builder.build_state(&state_factories()).await.err().unwrap();
		assert!(err.to_string().contains("not ready"));
	}

	#[tokio::test]
	async fn test_build_publisher() {
		let builder = OrdersBuilder::new(config(
			r#"
[pubsub]
pubsub_name = "orderpubsub"
topic = "neworders"
primary = "memory"
[pubsub.implementations.memory]
"#,
		));

		let service = builder.build_publisher(&publisher_factories()).await.unwrap();
		assert_eq!(service.pubsub_name(), "orderpubsub");
		assert_eq!(service.topic(), "neworders");
	}

	#[tokio::test]
	async fn test_build_publisher_missing_section() {
		let builder = OrdersBuilder::new(config(""));
		let err = builder.build_publisher(&publisher_factories()).await.err().unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(ref c) if c == "pubsub"));
	}

	#[test]
	fn test_subscription_defaults_and_overrides() {
		let subscription = OrdersBuilder::new(config("")).subscription();
		assert_eq!(
			subscription,
			Subscription {
				pubsubname: "pubsub".into(),
				topic: "orders".into(),
				route: "/neworder".into(),
			}
		);

		let subscription = OrdersBuilder::new(config(
			r#"
[pubsub]
pubsub_name = "orderpubsub"
subscribe_route = "/orders/incoming"
primary = "memory"
[pubsub.implementations.memory]
"#,
		))
		.subscription();
		assert_eq!(subscription.pubsubname, "orderpubsub");
		assert_eq!(subscription.topic, "orders");
		assert_eq!(subscription.route, "/orders/incoming");
	}

	#[tokio::test]
	async fn test_build_invoker() {
		let builder = OrdersBuilder::new(config(
			r#"
[invocation]
app_id = "checkout"
[invocation.sidecar]
wait_timeout_seconds = 0
"#,
		));

		let invoker = builder.build_invoker().await.unwrap();
		assert_eq!(invoker.app_id(), "checkout");
		assert_eq!(builder.invoke_route(), "/neworder");
	}

	#[tokio::test]
	async fn test_build_invoker_failures() {
		let err = OrdersBuilder::new(config("")).build_invoker().await.err().unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(ref c) if c == "invocation"));

		let builder = OrdersBuilder::new(config(
			"[invocation]\n[invocation.sidecar]\nhttp_endpoint = \"ftp://host\"\n",
		));
		assert!(matches!(
			builder.build_invoker().await.err().unwrap(),
			BuilderError::Config(_)
		));

		let builder = OrdersBuilder::new(config(
			"[invocation]\n[invocation.sidecar]\nhttp_endpoint = \"http://127.0.0.1:1\"\nwait_timeout_seconds = 1\n",
		));
		let err = builder.build_invoker().await.err().unwrap();
		assert!(err.to_string().contains("not ready"));
	}

	#[test]
	fn test_invoke_route() {
		assert_eq!(OrdersBuilder::new(config("")).invoke_route(), "/neworder");
		let builder = OrdersBuilder::new(config("[invocation]\nmethod = \"invoke/neworders\"\n"));
		assert_eq!(builder.invoke_route(), "/invoke/neworders");
	}
}
