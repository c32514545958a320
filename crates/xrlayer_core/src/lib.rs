//! Core negotiation logic for a chained runtime API layer.
//! This crate owns the handshake, extension negotiation and dispatch rules;
//! the FFI crate only adapts them to exported symbols.

pub mod abi;
pub mod boundary;
pub mod chain;
pub mod config;
pub mod extension;
pub mod layer;
pub mod logging;

pub use abi::{Instance, XrResult};
pub use boundary::guard;
pub use chain::ChainLink;
pub use config::{ConfigError, LayerConfig};
pub use extension::capability::CapabilitySet;
pub use extension::negotiate::{available_capabilities, negotiate, NegotiationError};
pub use extension::probe::probe;
pub use extension::registry::{
    CapabilityRegistry, ExtensionEntry, LayerDescriptor, RegistryError, LAYER_NAME,
};
pub use layer::bootstrap::BootstrapError;
pub use layer::context::{
    AttachedInstance, EntryPoints, LayerContext, LayerError, LayerHooks, PassthroughHooks,
};
pub use layer::request::InstanceRequest;
pub use logging::{default_log_level, init_logging, logging_status};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
