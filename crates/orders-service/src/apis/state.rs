//! State façade: create, read and delete orders by id.
//!
//! Each handler decodes its input, makes one call to the state service and
//! renders the outcome. Read and delete collapse every failure into 404.

use axum::{
	body::Bytes,
	extract::{Path, State},
	http::header,
	response::{IntoResponse, Json},
	routing::{get, post},
	Router,
};
use orders_state::StateService;
use orders_types::{APIError, MessageResponse, Order, SuccessResponse};
use std::sync::Arc;

/// Builds the state façade router.
pub fn router(state: Arc<StateService>) -> Router {
	Router::new()
		.route("/", get(hello))
		.route("/kv/orders", post(create_order))
		.route("/kv/orders/{id}", get(get_order).delete(delete_order))
		.with_state(state)
}

async fn hello() -> Json<MessageResponse> {
	Json(MessageResponse::new("Hello World"))
}

/// Handles POST /kv/orders.
///
/// The body is decoded by hand so that a malformed order is answered with
/// 500 `{"error": ..}` rather than the extractor's own rejection.
async fn create_order(
	State(state): State<Arc<StateService>>,
	body: Bytes,
) -> Result<Json<SuccessResponse>, APIError> {
	let order = Order::from_json(&body).map_err(|e| {
		tracing::warn!(error = %e, "Rejected order body");
		APIError::internal(e.to_string())
	})?;
	let value = order.to_json().map_err(|e| APIError::internal(e.to_string()))?;

	if let Err(e) = state.save_bytes(&order.key(), value).await {
		tracing::warn!(order_id = order.order_id, error = %e, "Failed to save order");
		return Err(APIError::internal(e.to_string()));
	}

	tracing::info!(order_id = order.order_id, store = %state.store_name(), "Saved order");
	Ok(Json(SuccessResponse::ok()))
}

/// Handles GET /kv/orders/{id}, returning the stored bytes unchanged.
async fn get_order(
	Path(id): Path<String>,
	State(state): State<Arc<StateService>>,
) -> Result<impl IntoResponse, APIError> {
	match state.get_bytes(&id).await {
		Ok(value) => Ok(([(header::CONTENT_TYPE, "application/json")], value)),
		Err(e) => {
			tracing::warn!(key = %id, error = %e, "Order lookup failed");
			Err(APIError::NotFound)
		},
	}
}

async fn delete_order(
	Path(id): Path<String>,
	State(state): State<Arc<StateService>>,
) -> Result<Json<SuccessResponse>, APIError> {
	match state.delete(&id).await {
		Ok(()) => {
			tracing::info!(key = %id, "Deleted order");
			Ok(Json(SuccessResponse::ok()))
		},
		Err(e) => {
			tracing::warn!(key = %id, error = %e, "Order delete failed");
			Err(APIError::NotFound)
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use axum::{
		body::{to_bytes, Body},
		http::{Method, Request, StatusCode},
		response::Response,
	};
	use mockall::mock;
	use orders_state::{implementations::memory::MemoryStateStore, StateError, StateStoreInterface};
	use orders_types::ConfigSchema;
	use serde_json::{json, Value};
	use tower::ServiceExt;

	mock! {
		Store {}

		#[async_trait]
		impl StateStoreInterface for Store {
			fn config_schema(&self) -> Box<dyn ConfigSchema>;
			async fn save(&self, store_name: &str, key: &str, value: Vec<u8>) -> Result<(), StateError>;
			async fn get(&self, store_name: &str, key: &str) -> Result<Vec<u8>, StateError>;
			async fn delete(&self, store_name: &str, key: &str) -> Result<(), StateError>;
		}
	}

	fn memory_app() -> Router {
		router(Arc::new(StateService::new(
			Box::new(MemoryStateStore::new()),
			"statestore",
		)))
	}

	fn mock_app(store: MockStore) -> Router {
		router(Arc::new(StateService::new(Box::new(store), "statestore")))
	}

	async fn send(app: &Router, method: Method, uri: &str, body: &str) -> Response {
		let request = Request::builder()
			.method(method)
			.uri(uri)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body.to_string()))
			.unwrap();
		app.clone().oneshot(request).await.unwrap()
	}

	async fn body_bytes(response: Response) -> Vec<u8> {
		to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
	}

	async fn body_json(response: Response) -> Value {
		serde_json::from_slice(&body_bytes(response).await).unwrap()
	}

	#[tokio::test]
	async fn test_hello_is_idempotent() {
		// No expectations: any backend call would panic.
		let app = mock_app(MockStore::new());
		for _ in 0..2 {
			let response = send(&app, Method::GET, "/", "").await;
			assert_eq!(response.status(), StatusCode::OK);
			assert_eq!(body_json(response).await, json!({"message": "Hello World"}));
		}
	}

	#[tokio::test]
	async fn test_order_lifecycle() {
		let app = memory_app();

		let response = send(&app, Method::POST, "/kv/orders", r#"{"orderId":7}"#).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_json(response).await, json!({"success": true}));

		let response = send(&app, Method::GET, "/kv/orders/7", "").await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(
			response.headers().get(header::CONTENT_TYPE).unwrap(),
			"application/json"
		);
		assert_eq!(body_bytes(response).await, br#"{"orderId":7}"#.to_vec());

		let response = send(&app, Method::DELETE, "/kv/orders/7", "").await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_json(response).await, json!({"success": true}));

		let response = send(&app, Method::GET, "/kv/orders/7", "").await;
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
		assert_eq!(body_json(response).await, json!({"message": "Not Found"}));
	}

	#[tokio::test]
	async fn test_create_then_read_for_various_ids() {
		let app = memory_app();
		for id in [0i64, -5, 1, 9_007_199_254_740_993, i64::MAX] {
			let body = format!(r#"{{"orderId":{}}}"#, id);
			let response = send(&app, Method::POST, "/kv/orders", &body).await;
			assert_eq!(response.status(), StatusCode::OK);

			let response = send(&app, Method::GET, &format!("/kv/orders/{}", id), "").await;
			assert_eq!(response.status(), StatusCode::OK);
			assert_eq!(body_bytes(response).await, body.into_bytes());
		}
	}

	#[tokio::test]
	async fn test_never_created_is_not_found() {
		let app = memory_app();

		let response = send(&app, Method::GET, "/kv/orders/12345", "").await;
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
		assert_eq!(body_json(response).await, json!({"message": "Not Found"}));

		let response = send(&app, Method::DELETE, "/kv/orders/12345", "").await;
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
		assert_eq!(body_json(response).await, json!({"message": "Not Found"}));
	}

	#[tokio::test]
	async fn test_malformed_body_makes_no_backend_call() {
		for body in ["{not json", r#"{"id":7}"#, r#"{"orderId":"seven"}"#, ""] {
			let app = mock_app(MockStore::new());
			let response = send(&app, Method::POST, "/kv/orders", body).await;
			assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

			let json = body_json(response).await;
			assert!(json["error"].is_string(), "unexpected body {}", json);
			assert_eq!(json.as_object().unwrap().len(), 1);
		}
	}

	#[tokio::test]
	async fn test_save_failure_is_internal_error() {
		let mut store = MockStore::new();
		store
			.expect_save()
			.times(1)
			.returning(|_, _, _| Err(StateError::Backend("sidecar unavailable".into())));

		let app = mock_app(store);
		let response = send(&app, Method::POST, "/kv/orders", r#"{"orderId":1}"#).await;
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(
			body_json(response).await,
			json!({"error": "Backend error: sidecar unavailable"})
		);
	}

	#[tokio::test]
	async fn test_save_receives_store_key_and_encoding() {
		let mut store = MockStore::new();
		store
			.expect_save()
			.withf(|store_name, key, value| {
				store_name == "statestore" && key == "42" && value == br#"{"orderId":42}"#
			})
			.times(1)
			.returning(|_, _, _| Ok(()));

		let app = mock_app(store);
		// Extra fields are dropped by the re-encode.
		let response = send(&app, Method::POST, "/kv/orders", r#"{"orderId":42,"note":"x"}"#).await;
		assert_eq!(response.status(), StatusCode::OK);
	}

	#[tokio::test]
	async fn test_backend_failures_collapse_to_not_found() {
		let mut store = MockStore::new();
		store
			.expect_get()
			.returning(|_, _| Err(StateError::Backend("connection refused".into())));
		store
			.expect_delete()
			.returning(|_, _| Err(StateError::Backend("connection refused".into())));

		let app = mock_app(store);

		let response = send(&app, Method::GET, "/kv/orders/1", "").await;
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
		assert_eq!(body_json(response).await, json!({"message": "Not Found"}));

		let response = send(&app, Method::DELETE, "/kv/orders/1", "").await;
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
		assert_eq!(body_json(response).await, json!({"message": "Not Found"}));
	}

	#[tokio::test]
	async fn test_id_is_used_verbatim() {
		let mut store = MockStore::new();
		store
			.expect_get()
			.withf(|_, key| key == "abc")
			.times(1)
			.returning(|_, _| Ok(b"stored as-is".to_vec()));

		let app = mock_app(store);
		let response = send(&app, Method::GET, "/kv/orders/abc", "").await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_bytes(response).await, b"stored as-is".to_vec());
	}
}
