//! Main entry point for the order façades.
//!
//! One binary runs any façade as its own process: the state façade over a
//! key/value store, the publish façade over a pub/sub component, the
//! subscriber that receives published orders, and the client and server of
//! service invocation. Backends are pluggable and selected by configuration.

use clap::{Parser, Subcommand};
use orders_config::{ApiConfig, Config};
use orders_pubsub::implementations::{
	dapr::create_publisher as create_dapr_publisher, memory::create_publisher as create_memory_publisher,
};
use orders_state::implementations::{
	dapr::create_state_store as create_dapr_store, file::create_state_store as create_file_store,
	memory::create_state_store as create_memory_store,
};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod builder;
mod server;

use builder::OrdersBuilder;

/// Command-line arguments for the order façades.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "ORDERS_CONFIG", default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	service: Service,
}

/// Façade to run.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
	/// Create, read and delete orders in the state store
	State,
	/// Publish incoming orders to the orders topic
	Publish,
	/// Receive orders delivered from the orders topic
	Subscribe,
	/// Forward orders to another application through the sidecar
	InvokeClient,
	/// Serve the method the invocation client calls
	InvokeServer,
}

impl Service {
	fn name(self) -> &'static str {
		match self {
			Service::State => "state",
			Service::Publish => "publish",
			Service::Subscribe => "subscribe",
			Service::InvokeClient => "invoke-client",
			Service::InvokeServer => "invoke-server",
		}
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(service = args.service.name(), config = %config_path, "Loaded configuration");

	run(args.service, config).await?;

	tracing::info!(service = args.service.name(), "Stopped");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the selected façade and serves it until shutdown.
async fn run(service: Service, config: Config) -> Result<(), Box<dyn std::error::Error>> {
	let router = build_router(service, &config).await?;

	let (server_config, default_port) = match service {
		Service::State => (&config.api.state, ApiConfig::DEFAULT_STATE_PORT),
		Service::Publish => (&config.api.publish, ApiConfig::DEFAULT_PUBLISH_PORT),
		Service::Subscribe => (&config.api.subscribe, ApiConfig::DEFAULT_SUBSCRIBE_PORT),
		Service::InvokeClient => (&config.api.invoke_client, ApiConfig::DEFAULT_INVOKE_CLIENT_PORT),
		Service::InvokeServer => (&config.api.invoke_server, ApiConfig::DEFAULT_INVOKE_SERVER_PORT),
	};

	server::start_server(service.name(), router, server_config, default_port).await
}

/// Wires the configured backend into the façade's router.
async fn build_router(service: Service, config: &Config) -> Result<axum::Router, Box<dyn std::error::Error>> {
	let builder = OrdersBuilder::new(config.clone());

	let router = match service {
		Service::State => {
			let factories = create_factory_map!(
				orders_state::StateStoreInterface,
				orders_state::StateError,
				"dapr" => create_dapr_store,
				"file" => create_file_store,
				"memory" => create_memory_store,
			);
			let state = builder.build_state(&factories).await?;
			apis::state::router(Arc::new(state))
		},
		Service::Publish => {
			let factories = create_factory_map!(
				orders_pubsub::PublisherInterface,
				orders_pubsub::PubSubError,
				"dapr" => create_dapr_publisher,
				"memory" => create_memory_publisher,
			);
			let publisher = builder.build_publisher(&factories).await?;
			apis::publish::router(Arc::new(publisher))
		},
		Service::Subscribe => apis::subscribe::router(builder.subscription()),
		Service::InvokeClient => apis::invoke::client_router(Arc::new(builder.build_invoker().await?)),
		Service::InvokeServer => apis::invoke::server_router(&builder.invoke_route()),
	};

	Ok(router)
}
