//! Exported layer entry points.
//!
//! # Responsibility
//! - Own the process-wide [`LayerContext`] and build it on first use.
//! - Adapt every loader-facing symbol onto a context method.
//!
//! # Invariants
//! - Exported functions must not unwind across the C boundary; each body
//!   runs inside [`guard`].
//! - Configuration or logging problems degrade to built-in defaults and
//!   never fail the host process.

use log::{error, info};
use once_cell::sync::Lazy;
use std::ffi::c_char;
use xrlayer_core::abi::{
    ApiLayerCreateInfo, ApiLayerProperties, ExtensionProperties, Instance, InstanceCreateInfo,
    NegotiateApiLayerRequest, NegotiateLoaderInfo, PfnVoidFunction, XrResult,
};
use xrlayer_core::{
    guard, init_logging, CapabilityRegistry, EntryPoints, LayerConfig, LayerContext,
    LayerDescriptor, PassthroughHooks,
};

static LAYER: Lazy<LayerContext> = Lazy::new(build_layer);

fn build_layer() -> LayerContext {
    let (config, config_error) = match LayerConfig::from_env() {
        Ok(config) => (config, None),
        Err(err) => (LayerConfig::default(), Some(err)),
    };

    // A host without a writable log directory still gets a working layer.
    let logging = init_logging(&config.log_level, &config.log_dir.to_string_lossy());

    if let Some(err) = config_error {
        error!(
            "event=layer_init module=ffi status=error error_code=config_invalid error={}",
            err
        );
    }
    let registry = CapabilityRegistry::from_config(&config).unwrap_or_else(|err| {
        error!(
            "event=layer_init module=ffi status=error error_code=registry_invalid error={}",
            err
        );
        CapabilityRegistry::builtin()
    });
    info!(
        "event=layer_init module=ffi status=ok advertised={} implicit={} blocked={} logging={}",
        registry.advertised().len(),
        registry.required_implicit().len(),
        registry.blocked().len(),
        if logging.is_ok() { "file" } else { "disabled" }
    );

    LayerContext::new(
        LayerDescriptor::builtin(),
        registry,
        entry_points(),
        Box::new(PassthroughHooks),
    )
}

/// The functions this library hands to the loader and the application.
pub fn entry_points() -> EntryPoints {
    EntryPoints {
        get_instance_proc_addr: xr_get_instance_proc_addr,
        create_api_layer_instance: xr_create_api_layer_instance,
        enumerate_instance_extension_properties: xr_enumerate_instance_extension_properties,
        enumerate_api_layer_properties: xr_enumerate_api_layer_properties,
        destroy_instance: xr_destroy_instance,
    }
}

/// Loader negotiation, the only symbol exported by name.
///
/// # Safety
/// Called by the loader with pointers that are null or valid for the call.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn xrNegotiateLoaderApiLayerInterface(
    loader_info: *const NegotiateLoaderInfo,
    layer_name: *const c_char,
    request: *mut NegotiateApiLayerRequest,
) -> XrResult {
    guard("xrNegotiateLoaderApiLayerInterface", || unsafe {
        LAYER.negotiate_loader_interface_raw(loader_info, layer_name, request)
    })
}

/// # Safety
/// See [`LayerContext::get_instance_proc_addr`].
pub unsafe extern "system" fn xr_get_instance_proc_addr(
    instance: Instance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult {
    guard("xrGetInstanceProcAddr", || unsafe {
        LAYER.get_instance_proc_addr(instance, name, function)
    })
}

/// # Safety
/// See [`LayerContext::create_api_layer_instance`].
pub unsafe extern "system" fn xr_create_api_layer_instance(
    create_info: *const InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance_out: *mut Instance,
) -> XrResult {
    guard("xrCreateApiLayerInstance", || unsafe {
        LAYER.create_api_layer_instance(create_info, api_layer_info, instance_out)
    })
}

/// # Safety
/// See [`LayerContext::enumerate_instance_extension_properties_raw`].
pub unsafe extern "system" fn xr_enumerate_instance_extension_properties(
    layer_name: *const c_char,
    capacity: u32,
    count_out: *mut u32,
    properties: *mut ExtensionProperties,
) -> XrResult {
    guard("xrEnumerateInstanceExtensionProperties", || unsafe {
        LAYER.enumerate_instance_extension_properties_raw(layer_name, capacity, count_out, properties)
    })
}

/// # Safety
/// See [`LayerContext::enumerate_api_layer_properties_raw`].
pub unsafe extern "system" fn xr_enumerate_api_layer_properties(
    capacity: u32,
    count_out: *mut u32,
    properties: *mut ApiLayerProperties,
) -> XrResult {
    guard("xrEnumerateApiLayerProperties", || unsafe {
        LAYER.enumerate_api_layer_properties_raw(capacity, count_out, properties)
    })
}

/// # Safety
/// `instance` must not be used by the caller after this returns.
pub unsafe extern "system" fn xr_destroy_instance(instance: Instance) -> XrResult {
    guard("xrDestroyInstance", || LAYER.destroy_instance(instance))
}
