//! Shared-library surface of the layer.
//!
//! The loader discovers the library through its manifest and calls
//! `xrNegotiateLoaderApiLayerInterface`; everything else is reached through
//! the pointers handed back there.

pub mod api;

pub use api::{entry_points, xrNegotiateLoaderApiLayerInterface};
