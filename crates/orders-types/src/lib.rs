//! Common types for the order façade services.
//!
//! This crate holds the data types shared by every façade: the `Order`
//! entity, HTTP response and error shapes, the CloudEvent envelope the
//! sidecar delivers subscriptions in, and the configuration validation
//! primitives used by pluggable implementations.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Event types delivered by the sidecar's pub/sub component.
pub mod events;
/// The order entity exchanged by every façade.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Redacting wrapper for credentials.
pub mod secret_string;
/// Configuration validation types for implementation-specific settings.
pub mod validation;

pub use api::*;
pub use events::*;
pub use order::Order;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use validation::*;
