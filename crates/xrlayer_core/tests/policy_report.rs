mod support;

use std::collections::HashMap;
use support::context_with;
use xrlayer_core::abi::{ExtensionProperties, XrResult};
use xrlayer_core::config::{
    ENV_ADVERTISED_EXTENSIONS, ENV_BLOCKED_EXTENSIONS, ENV_IMPLICIT_EXTENSIONS,
};
use xrlayer_core::{
    CapabilityRegistry, LayerConfig, LayerDescriptor, PassthroughHooks, RegistryError, LAYER_NAME,
};

fn config_from(pairs: &[(&str, &str)]) -> LayerConfig {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    LayerConfig::from_lookup(|key| map.get(key).cloned()).expect("valid config")
}

#[test]
fn configured_extensions_are_advertised_through_enumeration() {
    let config = config_from(&[(ENV_ADVERTISED_EXTENSIONS, "XR_TEMPLATE_a:5,XR_TEMPLATE_b")]);
    let registry = CapabilityRegistry::from_config(&config).expect("valid registry");
    let context = context_with(registry, Box::new(PassthroughHooks));
    let name = std::ffi::CString::new(LAYER_NAME).expect("layer name");

    let mut count = 0;
    let mut buffer = [ExtensionProperties::empty(); 2];
    let result = context.enumerate_instance_extension_properties(
        Some(name.as_c_str()),
        2,
        Some(&mut count),
        Some(&mut buffer[..]),
    );

    assert_eq!(result, XrResult::SUCCESS);
    assert_eq!(count, 2);
    assert_eq!(buffer[0].extension_version, 5);
    assert_eq!(buffer[1].extension_version, 1);
}

#[test]
fn malformed_policy_name_is_rejected_by_registry() {
    let config = config_from(&[(ENV_BLOCKED_EXTENSIONS, "XR-bad-name")]);
    let err = CapabilityRegistry::from_config(&config).expect_err("dash is not allowed");
    assert_eq!(err, RegistryError::InvalidName("XR-bad-name".to_string()));
}

#[test]
fn name_both_forced_and_blocked_is_rejected_by_registry() {
    let config = config_from(&[
        (ENV_IMPLICIT_EXTENSIONS, "XR_KHR_x"),
        (ENV_BLOCKED_EXTENSIONS, "XR_EXT_y,XR_KHR_x"),
    ]);
    let err = CapabilityRegistry::from_config(&config).expect_err("overlap is not allowed");
    assert_eq!(err, RegistryError::ImplicitAndBlocked("XR_KHR_x".to_string()));
}

#[test]
fn policy_serializes_with_stable_field_names() {
    let config = config_from(&[
        (ENV_IMPLICIT_EXTENSIONS, "XR_KHR_x"),
        (ENV_BLOCKED_EXTENSIONS, "XR_EXT_y"),
    ]);
    let registry = CapabilityRegistry::from_config(&config).expect("valid registry");

    let value = serde_json::to_value(&registry).expect("serializable registry");
    assert_eq!(value["required_implicit"], serde_json::json!(["XR_KHR_x"]));
    assert_eq!(value["blocked"], serde_json::json!(["XR_EXT_y"]));
    assert_eq!(value["advertised"], serde_json::json!([]));

    let value = serde_json::to_value(&config).expect("serializable config");
    assert!(value["log_level"].is_string());
    assert!(value["log_dir"].is_string());
}

#[test]
fn descriptor_serializes_layer_identity() {
    let value = serde_json::to_value(LayerDescriptor::builtin()).expect("serializable descriptor");
    assert_eq!(value["name"], LAYER_NAME);
    assert_eq!(value["layer_version"], 1);
    assert!(value["spec_version"].as_u64().is_some());
}
