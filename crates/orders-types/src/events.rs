//! Pub/sub delivery types.
//!
//! The sidecar wraps every published payload in a CloudEvents 1.0 envelope
//! before POSTing it to the subscriber's route, and discovers which routes to
//! call through the subscription list the subscriber advertises.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CloudEvents envelope as delivered by the sidecar.
///
/// Only `data` is relevant to order handling; the remaining attributes are
/// kept for logging and are all optional so a bare JSON body also decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub event_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub specversion: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub datacontenttype: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub topic: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pubsubname: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub traceid: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tracestate: Option<String>,
	#[serde(default)]
	pub data: Value,
	/// Top-level `orderId` of a body posted without an envelope.
	#[serde(default, rename = "orderId", skip_serializing_if = "Option::is_none")]
	pub order_id: Option<Value>,
}

impl CloudEvent {
	/// Locates the order id carried by this event.
	///
	/// Looks at `data.orderId`, then `data.key`, then a top-level `orderId`.
	/// Null values count as absent.
	pub fn order_id(&self) -> Option<&Value> {
		let present = |v: &&Value| !v.is_null();
		self.data
			.get("orderId")
			.filter(present)
			.or_else(|| self.data.get("key").filter(present))
			.or_else(|| self.order_id.as_ref().filter(present))
	}
}

/// Programmatic subscription entry returned from `GET /dapr/subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
	pub pubsubname: String,
	pub topic: String,
	pub route: String,
}
