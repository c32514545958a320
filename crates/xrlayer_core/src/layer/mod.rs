//! Layer entry-point logic.
//!
//! Every exported function of the FFI crate lands on a [`LayerContext`]
//! method defined across these submodules.

pub mod bootstrap;
pub mod context;
pub mod dispatch;
pub mod enumerate;
pub mod loader;
pub mod request;
