//! Publish façade: accepts orders and hands them to the publisher.

use axum::{
	body::Bytes,
	extract::State,
	response::Json,
	routing::{get, post},
	Router,
};
use orders_pubsub::PublishService;
use orders_types::{APIError, MessageResponse, Order, SuccessResponse};
use std::sync::Arc;

/// Builds the publish façade router.
pub fn router(publisher: Arc<PublishService>) -> Router {
	Router::new()
		.route("/", get(health))
		.route("/pubsub/neworders", post(publish_order))
		.with_state(publisher)
}

async fn health() -> Json<MessageResponse> {
	Json(MessageResponse::new("Publisher is running"))
}

/// Handles POST /pubsub/neworders.
///
/// Makes a single publish attempt; a failure is reported, never retried.
async fn publish_order(
	State(publisher): State<Arc<PublishService>>,
	body: Bytes,
) -> Result<Json<SuccessResponse>, APIError> {
	let order = Order::from_json(&body).map_err(|e| {
		tracing::warn!(error = %e, "Rejected order body");
		APIError::internal(e.to_string())
	})?;
	let payload = order.to_json().map_err(|e| APIError::internal(e.to_string()))?;

	if let Err(e) = publisher.publish_bytes(payload).await {
		tracing::warn!(order_id = order.order_id, error = %e, "Failed to publish order");
		return Err(APIError::internal(e.to_string()));
	}

	tracing::info!(
		order_id = order.order_id,
		pubsub = %publisher.pubsub_name(),
		topic = %publisher.topic(),
		"Published order"
	);
	Ok(Json(SuccessResponse::ok()))
}
