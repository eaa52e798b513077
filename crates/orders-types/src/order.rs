//! The order entity.

use serde::{Deserialize, Serialize};

/// An order as accepted, stored and published by the façades.
///
/// The JSON form is `{"orderId": <integer>}`; the same encoding is used as
/// the stored value and as the published payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	#[serde(rename = "orderId")]
	pub order_id: i64,
}

impl Order {
	/// Creates an order with the given id.
	pub fn new(order_id: i64) -> Self {
		Self { order_id }
	}

	/// State-store key for this order: the decimal form of its id.
	pub fn key(&self) -> String {
		self.order_id.to_string()
	}

	/// Decodes an order from a request body.
	///
	/// # Errors
	///
	/// Fails when the body is not JSON, or `orderId` is missing or not an
	/// integer. Unknown fields are ignored.
	pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
		serde_json::from_slice(bytes)
	}

	/// Encodes the order as `{"orderId":<id>}`, the form stored in the state
	/// store and published to the topic.
	pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
		serde_json::to_vec(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wire_format() {
		let order = Order::new(7);
		assert_eq!(order.to_json().unwrap(), br#"{"orderId":7}"#.to_vec());
		assert_eq!(order.key(), "7");
	}

	#[test]
	fn test_negative_and_large_ids() {
		for id in [-1, 0, i64::MAX, i64::MIN] {
			let bytes = Order::new(id).to_json().unwrap();
			let decoded = Order::from_json(&bytes).unwrap();
			assert_eq!(decoded.order_id, id);
			assert_eq!(decoded.key(), id.to_string());
		}
	}

	#[test]
	fn test_missing_order_id_rejected() {
		let err = Order::from_json(br#"{"id":7}"#).unwrap_err();
		assert!(err.to_string().contains("orderId"));
	}

	#[test]
	fn test_malformed_json_rejected() {
		assert!(Order::from_json(b"{not json").is_err());
		assert!(Order::from_json(b"").is_err());
		assert!(Order::from_json(br#"{"orderId":"seven"}"#).is_err());
	}

	#[test]
	fn test_unknown_fields_ignored() {
		let order = Order::from_json(br#"{"orderId":3,"note":"x"}"#).unwrap();
		assert_eq!(order, Order::new(3));
		// Re-encoding drops the extra field.
		assert_eq!(order.to_json().unwrap(), br#"{"orderId":3}"#.to_vec());
	}
}
