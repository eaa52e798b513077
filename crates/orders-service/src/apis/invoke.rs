//! Service invocation: a client that forwards orders through its sidecar to
//! another application, and the server that application runs.
//!
//! The client never addresses the server directly. It POSTs to its own
//! sidecar with the target named in `dapr-app-id`, and the sidecar routes the
//! call to the server's method route.

use axum::{
	body::Bytes,
	extract::State,
	response::Json,
	routing::{get, post},
	Router,
};
use orders_sidecar::DaprClient;
use orders_types::{APIError, MessageResponse, Order};
use std::sync::Arc;

/// Sends orders to one method of one application.
pub struct Invoker {
	client: DaprClient,
	app_id: String,
	method: String,
}

impl Invoker {
	/// Creates an invoker calling `method` on `app_id` through `client`.
	///
	/// # Arguments
	///
	/// * `client` - Client for the local sidecar
	/// * `app_id` - Id of the target application
	/// * `method` - Method route on the target
	pub fn new(client: DaprClient, app_id: impl Into<String>, method: impl Into<String>) -> Self {
		Self {
			client,
			app_id: app_id.into(),
			method: method.into(),
		}
	}

	pub fn app_id(&self) -> &str {
		&self.app_id
	}

	/// Waits until the local sidecar is ready.
	pub async fn wait_ready(&self) -> Result<(), orders_sidecar::SidecarError> {
		self.client.wait_for_sidecar(self.client.wait_timeout()).await
	}

	async fn invoke(&self, payload: &[u8]) -> Result<Vec<u8>, orders_sidecar::SidecarError> {
		self.client
			.invoke_method(&self.app_id, &self.method, payload)
			.await
	}
}

/// Builds the invocation client router.
pub fn client_router(invoker: Arc<Invoker>) -> Router {
	Router::new()
		.route("/", get(client_health))
		.route("/order", post(send_order))
		.with_state(invoker)
}

/// Builds the invocation server router, serving `route`.
pub fn server_router(route: &str) -> Router {
	Router::new()
		.route("/", get(server_health))
		.route(route, post(receive_order))
}

async fn client_health() -> Json<MessageResponse> {
	Json(MessageResponse::new("Client app is running"))
}

async fn server_health() -> Json<MessageResponse> {
	Json(MessageResponse::new("Server app is running"))
}

/// Handles POST /order by invoking the target once.
async fn send_order(State(invoker): State<Arc<Invoker>>, body: Bytes) -> Result<Json<Order>, APIError> {
	let order = Order::from_json(&body).map_err(|e| {
		tracing::warn!(error = %e, "Rejected order body");
		APIError::internal(e.to_string())
	})?;
	let payload = order.to_json().map_err(|e| APIError::internal(e.to_string()))?;

	if let Err(e) = invoker.invoke(&payload).await {
		tracing::error!(order_id = order.order_id, app_id = %invoker.app_id(), error = %e, "Invocation failed");
		return Err(APIError::internal(e.to_string()));
	}

	tracing::info!(order_id = order.order_id, app_id = %invoker.app_id(), "Invocation successful");
	Ok(Json(order))
}

async fn receive_order(body: Bytes) -> Result<Json<Order>, APIError> {
	let order = Order::from_json(&body).map_err(|e| {
		tracing::warn!(error = %e, "Rejected invocation body");
		APIError::bad_request("INVALID_ORDER", format!("Invalid order payload: {}", e))
	})?;

	tracing::info!(order_id = order.order_id, "Invocation received");
	Ok(Json(order))
}
