//! Subscribe façade: the receiving end of the orders topic.
//!
//! The sidecar asks `GET /dapr/subscribe` which topics to deliver and then
//! POSTs each event, wrapped in a CloudEvent, to the advertised route.

use axum::{
	body::Bytes,
	extract::State,
	response::Json,
	routing::{get, post},
	Router,
};
use orders_types::{APIError, CloudEvent, HealthResponse, OrderReceivedResponse, Subscription};
use std::sync::Arc;

/// Builds the subscriber router, registering the delivery route taken from
/// the subscription.
pub fn router(subscription: Subscription) -> Router {
	let route = subscription.route.clone();
	Router::new()
		.route("/", get(health))
		.route("/dapr/subscribe", get(subscriptions))
		.route(&route, post(receive_order))
		.with_state(Arc::new(subscription))
}

async fn health() -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "healthy".to_string(),
		message: "Health check passed. Everything is running smoothly!".to_string(),
	})
}

async fn subscriptions(State(subscription): State<Arc<Subscription>>) -> Json<Vec<Subscription>> {
	Json(vec![subscription.as_ref().clone()])
}

async fn receive_order(
	State(subscription): State<Arc<Subscription>>,
	body: Bytes,
) -> Result<Json<OrderReceivedResponse>, APIError> {
	let event: CloudEvent = serde_json::from_slice(&body).map_err(|e| {
		tracing::warn!(error = %e, "Rejected event body");
		APIError::bad_request("INVALID_EVENT", format!("Invalid event payload: {}", e))
	})?;

	let Some(order_id) = event.order_id().cloned() else {
		tracing::warn!(event_id = ?event.id, "Event carries no order id");
		return Err(APIError::bad_request(
			"MISSING_ORDER_ID",
			"Missing key in event data: orderId or key",
		));
	};

	tracing::info!(
		order_id = %order_id,
		event_id = ?event.id,
		topic = %event.topic.as_deref().unwrap_or(&subscription.topic),
		"Subscriber received order"
	);
	Ok(Json(OrderReceivedResponse {
		message: "Message received successfully".to_string(),
		order_id,
	}))
}
