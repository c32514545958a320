//! Extension availability contracts.
//!
//! This module holds the layer's static capability policy and the probing
//! and negotiation steps run against the downstream chain during instance
//! creation.

pub mod capability;
pub mod negotiate;
pub mod probe;
pub mod registry;
