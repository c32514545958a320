//! Panic containment for exported entry points.
//!
//! # Invariants
//! - Nothing but an `XrResult` ever leaves an entry point; a panic becomes
//!   `XR_ERROR_RUNTIME_FAILURE` plus one error log line naming the call.

use crate::abi::XrResult;
use crate::logging::panic_payload_summary;
use log::error;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs `call` and converts an unwinding panic into a runtime failure.
pub fn guard(call_name: &'static str, call: impl FnOnce() -> XrResult) -> XrResult {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let result = XrResult::ERROR_RUNTIME_FAILURE;
            error!(
                "event={} module=boundary status=error result={} error_code=panic payload={}",
                call_name,
                result,
                panic_payload_summary(payload.as_ref())
            );
            result
        }
    }
}
