//! API types for the façade HTTP endpoints.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Acknowledgment returned by successful write operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
	pub success: bool,
}

impl SuccessResponse {
	pub fn ok() -> Self {
		Self { success: true }
	}
}

/// Plain message body, used by health checks and the not-found response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
	pub message: String,
}

impl MessageResponse {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// Health check body of the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub message: String,
}

/// Acknowledgment of a delivered order event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceivedResponse {
	pub message: String,
	/// The id as found in the event; may be a number or a string key.
	#[serde(rename = "orderId")]
	pub order_id: serde_json::Value,
}

/// Error body for server-side failures: `{"error": "<msg>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
}

/// Error body for rejected input: `{"error": {"code": .., "message": ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedErrorResponse {
	pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
	pub code: String,
	pub message: String,
}

/// Structured API error type with its HTTP status mapping.
///
/// Every handler failure is converted into exactly one of these and
/// rendered through `IntoResponse`; no handler writes a second response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum APIError {
	/// Rejected input (400).
	BadRequest { code: String, message: String },
	/// Read or delete failed for any reason (404).
	NotFound,
	/// Decode, encode or sidecar failure on a write path (500).
	InternalServerError { message: String },
}

impl APIError {
	pub fn internal(message: impl Into<String>) -> Self {
		APIError::InternalServerError {
			message: message.into(),
		}
	}

	pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			code: code.into(),
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> StatusCode {
		match self {
			APIError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			APIError::NotFound => StatusCode::NOT_FOUND,
			APIError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { code, message } => write!(f, "Bad Request ({}): {}", code, message),
			APIError::NotFound => write!(f, "Not Found"),
			APIError::InternalServerError { message } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl IntoResponse for APIError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		match self {
			APIError::BadRequest { code, message } => (
				status,
				Json(DetailedErrorResponse {
					error: ErrorDetail { code, message },
				}),
			)
				.into_response(),
			APIError::NotFound => (status, Json(MessageResponse::new("Not Found"))).into_response(),
			APIError::InternalServerError { message } => {
				(status, Json(ErrorResponse { error: message })).into_response()
			},
		}
	}
}
