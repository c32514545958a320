//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `xrlayer_core` linkage without a loader or runtime.
//! - Print the effective layer identity and capability policy as JSON so a
//!   manifest author can check what the environment resolves to.

use std::process::ExitCode;
use xrlayer_core::{core_version, CapabilityRegistry, LayerConfig, LayerDescriptor};

fn main() -> ExitCode {
    let config = match LayerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("xrlayer config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let registry = match CapabilityRegistry::from_config(&config) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("xrlayer registry error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = serde_json::json!({
        "core_version": core_version(),
        "layer": LayerDescriptor::builtin(),
        "config": config,
        "registry": registry,
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("xrlayer report error: {err}");
            ExitCode::FAILURE
        }
    }
}
