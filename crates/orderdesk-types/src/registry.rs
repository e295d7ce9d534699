//! Registry trait for self-registering implementations.
//!
//! Each pluggable backend (storage, notification sender, refund gateway)
//! exposes a `Registry` marker type implementing this trait, so the service
//! binary can map configuration names to factory functions without a
//! hand-maintained match.

/// Declares the configuration name and factory of one implementation.
pub trait ImplementationRegistry {
	/// Name used under `implementations.<name>` in the configuration file,
	/// e.g. `memory` for `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// Factory function type for the implementation family.
	type Factory;

	/// Returns the factory that builds the implementation from its config table.
	fn factory() -> Self::Factory;
}
