//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each capability crate (state store, publisher) gives every implementation
/// a `Registry` type implementing this trait, pairing the name used under
/// `implementations.<name>` in the configuration with its factory function.
pub trait ImplementationRegistry {
	/// Configuration name, e.g. "dapr" for `[state.implementations.dapr]`.
	const NAME: &'static str;

	/// Factory function type of the owning capability.
	type Factory;

	fn factory() -> Self::Factory;
}
